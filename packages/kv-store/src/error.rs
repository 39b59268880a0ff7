use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage file {path} could not be accessed: {error}")]
    Io { path: PathBuf, error: io::Error },

    #[error("storage file {path} is not valid JSON: {error}")]
    Parse {
        path: PathBuf,
        error: serde_json::Error,
    },

    #[error("storage for {path} could not be encoded as JSON: {error}")]
    Serialize {
        path: PathBuf,
        error: serde_json::Error,
    },

    #[error("storage file {path} must contain a JSON object")]
    NotAnObject { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, StoreError>;
