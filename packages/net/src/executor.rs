//! HTTP execution abstraction.
//!
//! The facade never talks to reqwest directly: real-mode requests go
//! through an [`HttpExecutor`], so tests can substitute canned responses
//! or failures without a network.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{NetError, TransportError, TransportErrorKind};
use crate::types::{HttpRequest, HttpResponse};

/// Sends a request over the wire and waits for the whole response.
///
/// Implementations run on background threads, one call per request.
pub trait HttpExecutor: Send + Sync {
    /// Execute `request`. Any HTTP status is a response; only failures to
    /// obtain one are errors.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Production executor backed by a blocking reqwest client.
pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    pub fn new(timeout: Duration) -> Result<Self, NetError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// 30 second timeout.
    pub fn with_default_timeout() -> Result<Self, NetError> {
        Self::new(Duration::from_secs(30))
    }
}

impl HttpExecutor for ReqwestExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        check_scheme(&request.url)?;

        let method: http::Method = request.method.into();

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let header_name = HeaderName::try_from(name.as_str())
                .map_err(|e| TransportError::new(TransportErrorKind::Generic, e.to_string()))?;
            let header_value = HeaderValue::try_from(value.as_str())
                .map_err(|e| TransportError::new(TransportErrorKind::Generic, e.to_string()))?;
            headers.insert(header_name, header_value);
        }

        let mut req_builder = self.client.request(method, &request.url).headers(headers);
        if let Some(body) = &request.body {
            req_builder = req_builder.body(body.clone());
        }

        let response = req_builder.send().map_err(|e| classify(&e))?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string();

        let mut resp_headers = std::collections::BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                resp_headers.insert(name.to_string(), v.to_string());
            }
        }

        let body = response.text().map_err(|e| classify(&e))?;

        Ok(HttpResponse {
            status,
            status_text,
            headers: resp_headers,
            body,
        })
    }
}

/// Only http and https leave the host.
fn check_scheme(raw: &str) -> Result<(), TransportError> {
    let parsed = url::Url::parse(raw).map_err(|e| {
        TransportError::new(TransportErrorKind::Generic, format!("invalid URL {raw:?}: {e}"))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(TransportError::new(
            TransportErrorKind::Policy,
            format!("scheme {other:?} is not allowed"),
        )),
    }
}

/// Map a reqwest failure onto the transport taxonomy by walking its
/// source chain.
pub fn classify(error: &reqwest::Error) -> TransportError {
    let message = error.to_string();
    if error.is_timeout() {
        return TransportError::new(TransportErrorKind::Timeout, message);
    }

    let mut chain = Vec::new();
    let mut source: Option<&(dyn StdError + 'static)> = error.source();
    while let Some(cause) = source {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            if let Some(kind) = io_kind(io_error.kind()) {
                return TransportError::new(kind, message);
            }
        }
        chain.push(cause.to_string().to_lowercase());
        source = cause.source();
    }

    let kind = chain
        .iter()
        .find_map(|text| text_kind(text))
        .unwrap_or(TransportErrorKind::Generic);
    TransportError::new(kind, message)
}

fn io_kind(kind: io::ErrorKind) -> Option<TransportErrorKind> {
    match kind {
        io::ErrorKind::ConnectionRefused => Some(TransportErrorKind::ConnectionRefused),
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => Some(TransportErrorKind::Reset),
        io::ErrorKind::TimedOut => Some(TransportErrorKind::Timeout),
        _ => None,
    }
}

fn text_kind(text: &str) -> Option<TransportErrorKind> {
    const DNS: &[&str] = &[
        "dns",
        "failed to lookup address",
        "name or service not known",
        "no such host",
        "nodename nor servname",
    ];
    const TLS: &[&str] = &["certificate", "tls", "ssl", "handshake"];

    if DNS.iter().any(|needle| text.contains(needle)) {
        Some(TransportErrorKind::Dns)
    } else if TLS.iter().any(|needle| text.contains(needle)) {
        Some(TransportErrorKind::Tls)
    } else if text.contains("connection refused") {
        Some(TransportErrorKind::ConnectionRefused)
    } else if text.contains("reset") || text.contains("closed before message completed") {
        Some(TransportErrorKind::Reset)
    } else if text.contains("timed out") {
        Some(TransportErrorKind::Timeout)
    } else {
        None
    }
}

/// Canned executor for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex, PoisonError};

    /// Returns predefined responses keyed by URL and records every request.
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        responses: Arc<Mutex<BTreeMap<String, Result<HttpResponse, TransportError>>>>,
        recorded_requests: Arc<Mutex<Vec<HttpRequest>>>,
        delay: Duration,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_response(self, url: impl Into<String>, response: HttpResponse) -> Self {
            self.responses
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(url.into(), Ok(response));
            self
        }

        pub fn with_failure(self, url: impl Into<String>, kind: TransportErrorKind) -> Self {
            self.responses
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(url.into(), Err(TransportError::new(kind, "mock failure")));
            self
        }

        /// Sleep this long before answering, like a slow server.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.recorded_requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// A 200 response with `body`.
        pub fn ok(body: impl Into<String>) -> HttpResponse {
            HttpResponse {
                status: 200,
                status_text: "OK".to_string(),
                headers: BTreeMap::new(),
                body: body.into(),
            }
        }
    }

    impl HttpExecutor for MockExecutor {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.recorded_requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
            self.responses
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&request.url)
                .cloned()
                .unwrap_or_else(|| {
                    Err(TransportError::new(
                        TransportErrorKind::Dns,
                        format!("no mock for {}", request.url),
                    ))
                })
        }
    }
}
