//! # luawidget-cli
//!
//! Runs a launcher widget script from the terminal.
//!
//! Batch mode drives the script through the launcher lifecycle once and
//! prints what it rendered:
//!
//! ```bash
//! luawidget widgets/router.lua --fixtures fixtures/router.json
//! luawidget widgets/router.lua --long-click 1 --menu 2
//! luawidget widgets/router.lua --entry on_network_result --arg null --arg 404
//! ```
//!
//! `--interactive` opens a REPL on the same [`Session`] instead:
//!
//! ```text
//! router.lua [mock]> resume
//! on_resume: ok (1 network result(s) delivered)
//! CPU 5% Memory 50%
//! router.lua [mock]> mode real
//! ```

pub mod commands;
pub mod completer;
pub mod error;
pub mod host;
pub mod io;
pub mod repl;
pub mod session;

pub use error::{Result, SessionError};
pub use repl::ReplCore;
pub use session::{parse_arg, Report, Session, Step};
