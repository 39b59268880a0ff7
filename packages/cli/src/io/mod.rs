//! How the REPL reaches its user.
//!
//! [`ReplCore`](crate::ReplCore) only sees an [`IoHost`]: it hands over the
//! prompt, gets back an [`Event`], and writes [`Output`]. A terminal host
//! and the scripted test host plug in behind the same trait.

mod types;

#[cfg(test)]
mod test_host;

pub use types::{Event, ExitReason, Output, PromptState};

#[cfg(test)]
pub use test_host::TestHost;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("line editor failed: {0}")]
    Editor(String),
}

pub trait IoHost {
    /// Show `prompt` and block until the user does something.
    fn next_event(&mut self, prompt: &PromptState) -> Result<Event, IoError>;

    fn write(&mut self, output: Output) -> Result<(), IoError>;

    fn flush(&mut self) -> Result<(), IoError> {
        Ok(())
    }
}
