use luawidget_kv_store::StoreError;
use luawidget_net::NetError;
use luawidget_runtime::RuntimeError;
use thiserror::Error;

use crate::io::IoError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("argument {text:?} is not JSON: {error}")]
    Argument {
        text: String,
        error: serde_json::Error,
    },

    #[error("no context menu is open")]
    NoMenu,

    #[error("menu has {len} entries; {index} is out of range")]
    MenuIndex { index: i64, len: usize },

    #[error(transparent)]
    Repl(#[from] IoError),
}

impl SessionError {
    /// Whether the script could not be loaded, the one failure that makes
    /// the process exit non-zero.
    pub fn is_load_error(&self) -> bool {
        matches!(self, SessionError::Runtime(e) if e.is_load_error())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
