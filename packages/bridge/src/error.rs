//! Error types for the value bridge.

use thiserror::Error;

/// Errors raised while moving values across the host/guest boundary.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A table nests deeper than the bridge will follow. Self-referencing
    /// guest tables end up here instead of overflowing the stack.
    #[error("value nesting exceeds {limit} levels")]
    TooDeep { limit: usize },

    /// The interpreter rejected an operation (allocation, registry access).
    #[error("lua error: {0}")]
    Lua(#[from] mlua::Error),
}

impl From<BridgeError> for mlua::Error {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Lua(inner) => inner,
            other => mlua::Error::external(other),
        }
    }
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
