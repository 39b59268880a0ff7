use std::path::PathBuf;

use luawidget_bridge::BridgeError;
use thiserror::Error;

/// Errors from loading or driving a guest program.
///
/// Load errors (`Syntax`, `Init`, `Io`) are fatal for that load. Everything
/// else describes one failed invocation; the runtime stays usable.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("syntax error in {chunk}: {message}")]
    Syntax { chunk: String, message: String },

    #[error("{chunk} failed while loading: {message}")]
    Init { chunk: String, message: String },

    #[error("global {entry} is a {kind}, not a function")]
    NotCallable { entry: String, kind: &'static str },

    #[error("{entry} failed: {message}")]
    Guest { entry: String, message: String },

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("interpreter error: {0}")]
    Lua(#[from] mlua::Error),

    #[error("could not read {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl RuntimeError {
    /// Whether the error prevented the guest from loading at all.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            RuntimeError::Syntax { .. } | RuntimeError::Init { .. } | RuntimeError::Io { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// The guest-facing part of an interpreter error, without the wrapping
/// mlua adds around callback failures.
pub(crate) fn guest_message(error: &mlua::Error) -> String {
    match error {
        mlua::Error::RuntimeError(message) => message.clone(),
        mlua::Error::SyntaxError { message, .. } => message.clone(),
        mlua::Error::CallbackError { cause, .. } => guest_message(cause),
        other => other.to_string(),
    }
}
