//! The network facade every guest HTTP call goes through.
//!
//! Issuing a request never blocks: the facade records it, hands the work
//! to a background thread (one per request, like a broker) and returns a
//! [`RequestId`]. Completions come back over a channel and are drained
//! only by the thread that owns the guest, through
//! [`NetworkFacade::next_completion`].
//!
//! Several guest runtimes may share one facade (a reload creates a new
//! runtime before the old one is gone). Each runtime only asks for its
//! own request ids. A completion nobody has asked for yet is parked until
//! its owner does, and ids from a runtime that has been torn down are
//! [abandoned](NetworkFacade::abandon) so their completions are dropped.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{NetError, TransportError, TransportErrorKind};
use crate::executor::{HttpExecutor, ReqwestExecutor};
use crate::fixtures::{FixtureMatch, FixtureSet, MatchKind};
use crate::types::{HttpRequest, HttpResponse, Method};

/// Allowance for thread start-up and channel delivery on top of a
/// request's own bound.
const DELIVERY_SLACK: Duration = Duration::from_secs(1);

pub type RequestId = u64;

/// Where requests are answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Mock,
    Real,
}

impl FromStr for Mode {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Mode::Mock),
            "real" => Ok(Mode::Real),
            _ => Err(NetError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Mock => "mock",
            Mode::Real => "real",
        })
    }
}

/// Facade configuration.
#[derive(Debug, Clone)]
pub struct FacadeConfig {
    pub mode: Mode,
    /// Delay before a mock response is delivered.
    pub mock_latency: Duration,
    /// Timeout for real requests.
    pub timeout: Duration,
    /// How many recorded requests and diagnostics are kept; older ones are
    /// dropped first.
    pub history_limit: usize,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Mock,
            mock_latency: Duration::from_millis(50),
            timeout: Duration::from_secs(30),
            history_limit: 500,
        }
    }
}

/// How a request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    MockHit {
        key: String,
        kind: MatchKind,
        status: u16,
        body: Option<String>,
    },
    MockMiss {
        known_keys: Vec<String>,
    },
    RealSuccess(HttpResponse),
    RealError(TransportError),
}

impl Outcome {
    /// The body handed to the guest.
    pub fn body(&self) -> Option<&str> {
        match self {
            Outcome::MockHit { body, .. } => body.as_deref(),
            Outcome::MockMiss { .. } => None,
            Outcome::RealSuccess(response) => Some(&response.body),
            Outcome::RealError(_) => None,
        }
    }

    /// The status handed to the guest: 404 for a mock miss, 0 for a
    /// transport failure.
    pub fn status(&self) -> u16 {
        match self {
            Outcome::MockHit { status, .. } => *status,
            Outcome::MockMiss { .. } => 404,
            Outcome::RealSuccess(response) => response.status,
            Outcome::RealError(_) => 0,
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Outcome::RealError(_))
    }
}

/// A finished request, ready for dispatch to its guest.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub id: RequestId,
    pub method: Method,
    pub url: String,
    pub outcome: Outcome,
}

/// A request as issued, after header merging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedRequest {
    pub id: RequestId,
    pub mode: Mode,
    #[serde(flatten)]
    pub request: HttpRequest,
}

/// Something worth showing whoever is debugging the widget.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    MockMiss {
        method: Method,
        url: String,
        known_keys: Vec<String>,
    },
    Transport {
        method: Method,
        url: String,
        error: TransportError,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MockMiss {
                method,
                url,
                known_keys,
            } => {
                write!(f, "no fixture for {method} {url}")?;
                if known_keys.is_empty() {
                    write!(f, " (no fixtures loaded)")
                } else {
                    write!(f, " (known: {})", known_keys.join(", "))
                }
            }
            Diagnostic::Transport { method, url, error } => {
                write!(f, "{method} {url} failed: {error}")
            }
        }
    }
}

/// Intercepts every guest HTTP request.
pub struct NetworkFacade {
    config: FacadeConfig,
    fixtures: FixtureSet,
    executor: Option<Arc<dyn HttpExecutor>>,
    global_headers: BTreeMap<String, String>,
    next_id: RequestId,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
    parked: Vec<Completion>,
    /// When each request in flight is due at the latest.
    in_flight: BTreeMap<RequestId, Instant>,
    abandoned: BTreeSet<RequestId>,
    recorded: Vec<RecordedRequest>,
    diagnostics: Vec<Diagnostic>,
}

impl NetworkFacade {
    /// A facade whose real-mode executor is built on first use.
    pub fn new(config: FacadeConfig, fixtures: FixtureSet) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            config,
            fixtures,
            executor: None,
            global_headers: BTreeMap::new(),
            next_id: 0,
            sender,
            receiver,
            parked: Vec::new(),
            in_flight: BTreeMap::new(),
            abandoned: BTreeSet::new(),
            recorded: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn HttpExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    /// Switch modes. Requests already issued finish the way they started.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode != self.config.mode {
            tracing::info!(%mode, "network mode switched");
        }
        self.config.mode = mode;
    }

    pub fn fixtures(&self) -> &FixtureSet {
        &self.fixtures
    }

    pub fn set_fixtures(&mut self, fixtures: FixtureSet) {
        self.fixtures = fixtures;
    }

    pub fn global_headers(&self) -> &BTreeMap<String, String> {
        &self.global_headers
    }

    /// Replace the headers merged into every subsequent request.
    pub fn set_global_headers(&mut self, headers: BTreeMap<String, String>) {
        self.global_headers = headers;
    }

    pub fn clear_global_headers(&mut self) {
        self.global_headers.clear();
    }

    pub fn recorded_requests(&self) -> &[RecordedRequest] {
        &self.recorded
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The latest moment any request now in flight can complete: its mock
    /// latency or real-mode timeout from when it was issued, plus a little
    /// slack for delivery.
    pub fn due_by(&self) -> Option<Instant> {
        self.in_flight.values().max().copied()
    }

    /// Requests issued but not yet collected by their owner.
    pub fn outstanding(&self) -> usize {
        self.in_flight.len() + self.parked.len()
    }

    /// Issue a request. It always eventually completes.
    pub fn issue(
        &mut self,
        method: Method,
        url: &str,
        headers: BTreeMap<String, String>,
        body: Option<String>,
    ) -> RequestId {
        self.next_id += 1;
        let id = self.next_id;

        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers: merge_headers(&self.global_headers, headers),
            body,
        };
        let mode = self.config.mode;
        tracing::debug!(id, %method, url, %mode, "request issued");
        push_bounded(
            &mut self.recorded,
            RecordedRequest {
                id,
                mode,
                request: request.clone(),
            },
            self.config.history_limit,
        );
        let bound = match mode {
            Mode::Mock => self.config.mock_latency,
            Mode::Real => self.config.timeout,
        };
        self.in_flight.insert(id, Instant::now() + bound + DELIVERY_SLACK);

        match mode {
            Mode::Mock => self.issue_mock(id, request),
            Mode::Real => self.issue_real(id, request),
        }
        id
    }

    fn issue_mock(&mut self, id: RequestId, request: HttpRequest) {
        let outcome = match self.fixtures.lookup(&request.url) {
            Some(FixtureMatch { key, kind, fixture }) => {
                tracing::debug!(id, key = %key, %kind, status = fixture.status, "fixture hit");
                Outcome::MockHit {
                    key,
                    kind,
                    status: fixture.status,
                    body: fixture.body,
                }
            }
            None => {
                let known_keys = self.fixtures.keys();
                tracing::warn!(
                    id,
                    method = %request.method,
                    url = %request.url,
                    known = ?known_keys,
                    "no fixture matches request"
                );
                push_bounded(
                    &mut self.diagnostics,
                    Diagnostic::MockMiss {
                        method: request.method,
                        url: request.url.clone(),
                        known_keys: known_keys.clone(),
                    },
                    self.config.history_limit,
                );
                Outcome::MockMiss { known_keys }
            }
        };

        let completion = Completion {
            id,
            method: request.method,
            url: request.url,
            outcome,
        };
        let latency = self.config.mock_latency;
        let sender = self.sender.clone();
        let spawned = thread::Builder::new()
            .name(format!("luawidget-mock-{id}"))
            .spawn({
                let completion = completion.clone();
                move || {
                    thread::sleep(latency);
                    let _ = sender.send(completion);
                }
            });
        if let Err(error) = spawned {
            tracing::debug!(id, %error, "delivering mock response inline");
            self.accept(completion);
        }
    }

    fn issue_real(&mut self, id: RequestId, request: HttpRequest) {
        let executor = match self.executor() {
            Ok(executor) => executor,
            Err(error) => {
                self.accept(Completion {
                    id,
                    method: request.method,
                    url: request.url,
                    outcome: Outcome::RealError(error),
                });
                return;
            }
        };

        let method = request.method;
        let url = request.url.clone();
        let sender = self.sender.clone();
        let spawned = thread::Builder::new()
            .name(format!("luawidget-http-{id}"))
            .spawn(move || {
                let outcome = match executor.execute(&request) {
                    Ok(response) => Outcome::RealSuccess(response),
                    Err(error) => Outcome::RealError(error),
                };
                let _ = sender.send(Completion {
                    id,
                    method: request.method,
                    url: request.url,
                    outcome,
                });
            });

        if let Err(error) = spawned {
            self.accept(Completion {
                id,
                method,
                url,
                outcome: Outcome::RealError(TransportError::new(
                    TransportErrorKind::Generic,
                    format!("could not start request thread: {error}"),
                )),
            });
        }
    }

    fn executor(&mut self) -> Result<Arc<dyn HttpExecutor>, TransportError> {
        if let Some(executor) = &self.executor {
            return Ok(executor.clone());
        }
        let executor: Arc<dyn HttpExecutor> = Arc::new(
            ReqwestExecutor::new(self.config.timeout)
                .map_err(|e| TransportError::new(TransportErrorKind::Generic, e.to_string()))?,
        );
        self.executor = Some(executor.clone());
        Ok(executor)
    }

    /// Take in a completion from the channel (or an inline failure) and
    /// park it for its owner, unless the owner has gone away.
    fn accept(&mut self, completion: Completion) {
        self.in_flight.remove(&completion.id);
        if self.abandoned.remove(&completion.id) {
            tracing::debug!(id = completion.id, "dropping completion of abandoned request");
            return;
        }

        if let Outcome::RealError(error) = &completion.outcome {
            tracing::warn!(
                id = completion.id,
                url = %completion.url,
                kind = %error.kind,
                message = %error.message,
                "request failed"
            );
            push_bounded(
                &mut self.diagnostics,
                Diagnostic::Transport {
                    method: completion.method,
                    url: completion.url.clone(),
                    error: error.clone(),
                },
                self.config.history_limit,
            );
        }
        self.parked.push(completion);
    }

    fn take_parked(&mut self, wanted: &dyn Fn(RequestId) -> bool) -> Option<Completion> {
        let position = self.parked.iter().position(|c| wanted(c.id))?;
        Some(self.parked.remove(position))
    }

    /// Wait until `deadline` for the next completion whose id `wanted`
    /// accepts. Completions for other ids stay parked for their owners.
    pub fn next_completion(
        &mut self,
        wanted: &dyn Fn(RequestId) -> bool,
        deadline: Instant,
    ) -> Option<Completion> {
        loop {
            if let Some(completion) = self.take_parked(wanted) {
                return Some(completion);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(completion) => self.accept(completion),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }
    }

    /// Forget `ids`: completions already parked are dropped now, those
    /// still in flight are dropped on arrival.
    pub fn abandon(&mut self, ids: impl IntoIterator<Item = RequestId>) {
        for id in ids {
            if let Some(position) = self.parked.iter().position(|c| c.id == id) {
                self.parked.remove(position);
            } else if self.in_flight.contains_key(&id) {
                self.abandoned.insert(id);
            }
        }
    }
}

fn push_bounded<T>(list: &mut Vec<T>, item: T, limit: usize) {
    list.push(item);
    if list.len() > limit {
        let excess = list.len() - limit;
        list.drain(..excess);
    }
}

/// Request headers override global ones; names compare case-insensitively.
pub fn merge_headers(
    global: &BTreeMap<String, String>,
    request: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged: BTreeMap<String, String> = global
        .iter()
        .filter(|(name, _)| !request.keys().any(|r| r.eq_ignore_ascii_case(name)))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    merged.extend(request);
    merged
}
