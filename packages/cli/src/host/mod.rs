//! Host implementations for the REPL. The terminal host uses Reedline.

pub mod terminal;

pub use terminal::TerminalHost;
