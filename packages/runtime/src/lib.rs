//! # luawidget-runtime
//!
//! Runs launcher widget scripts off-device.
//!
//! A [`GuestRuntime`] is one fresh Lua state with the launcher's capability
//! tables installed as globals:
//!
//! | global    | what it does                                             |
//! |-----------|----------------------------------------------------------|
//! | `ui`      | renders into a single text output buffer                 |
//! | `http`    | asynchronous requests through the network facade         |
//! | `json`    | `decode` / `encode`                                      |
//! | `storage` | durable key-value storage shared by every runtime        |
//! | `files`   | plain files inside one sandbox directory                 |
//! | `system`  | browser opens, toasts, clock and date                    |
//! | `device`  | fixed stand-ins for phone device APIs                    |
//! | `log`     | routes guest messages (and `print`) to `tracing`         |
//!
//! The host drives the script through named entry points and then
//! [settles](GuestRuntime::settle) it: network completions are delivered
//! to their callbacks or `on_network_result` entry points until nothing
//! the script started is still pending.
//!
//! ```ignore
//! use luawidget_runtime::{entry, GuestRuntime, HostServices, RuntimeConfig};
//!
//! let runtime = GuestRuntime::load(source, "cpu.lua", HostServices::in_memory(), RuntimeConfig::default())?;
//! runtime.call(entry::ON_RESUME, &[])?;
//! runtime.settle_default();
//! println!("{}", runtime.output());
//! ```

mod capability;
pub mod error;
pub mod guest;
pub mod host;
pub mod render;

pub use error::{Result, RuntimeError};
pub use guest::{entry, GuestRuntime, Invocation, RuntimeConfig, SettleReport};
pub use host::{Continuation, GuestState, HostServices, Surface};
