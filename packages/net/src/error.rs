use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors setting up the facade. Request failures are not errors here:
/// they become [`TransportError`] outcomes delivered to the guest.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("fixture file {path} could not be read: {error}")]
    FixtureIo {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("fixture file {path} is not valid JSON: {error}")]
    FixtureParse {
        path: PathBuf,
        error: serde_json::Error,
    },

    #[error("fixtures must be a JSON object mapping URL keys to responses")]
    FixtureShape,

    #[error("unknown network mode {0:?} (expected \"mock\" or \"real\")")]
    InvalidMode(String),

    #[error("HTTP client could not be built: {0}")]
    Client(#[from] reqwest::Error),
}

/// How a real request failed before producing a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Dns,
    ConnectionRefused,
    Reset,
    Tls,
    Timeout,
    /// The request was refused before leaving the host, e.g. a non-HTTP
    /// scheme the launcher's web view would block.
    Policy,
    Generic,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::Dns => "dns",
            TransportErrorKind::ConnectionRefused => "connection refused",
            TransportErrorKind::Reset => "connection reset",
            TransportErrorKind::Tls => "tls",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Policy => "policy",
            TransportErrorKind::Generic => "transport",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NetError>;
