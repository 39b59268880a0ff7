//! # luawidget-bridge
//!
//! The boundary between the host and a Lua guest program.
//!
//! Guest programs are widget scripts: they build tables, hand functions
//! to the host as callbacks, and expect the host to call them back later.
//! This crate owns the two pieces that make that safe:
//!
//! - [`Value`] is the host's own tagged model of a guest value. Every
//!   crossing deep-copies, so a host-held [`Value`] never aliases a table
//!   the interpreter may mutate or collect.
//! - [`CallbackRegistry`] keeps guest functions reachable (through the Lua
//!   registry) for as long as the host intends to call them, and performs
//!   every call protected: a guest error is logged, never propagated.
//!
//! ## Conversions
//!
//! ```ignore
//! use luawidget_bridge::{to_guest, to_host, CallbackRegistry, Table, Value};
//!
//! let lua = mlua::Lua::new();
//! let callbacks = CallbackRegistry::new();
//!
//! let mut table = Table::new();
//! table.insert("cpu", Value::from(5.0));
//! let guest = to_guest(&lua, &Value::Table(table), &callbacks)?;
//! let back = to_host(&lua, &guest, &callbacks)?;
//! ```
//!
//! [`to_json`] and [`from_json`] map the same model onto `serde_json`,
//! which is the structured encoding shared by the `json` and `storage`
//! capabilities.

pub mod callback;
pub mod convert;
pub mod error;
pub mod json;
pub mod value;

pub use callback::{CallbackHandle, CallbackRegistry};
pub use convert::{
    args_to_guest, to_guest, to_host, to_host_data, values_to_host, MAX_DEPTH, MAX_SAFE_INTEGER,
};
pub use error::{BridgeError, Result};
pub use json::{from_json, to_json};
pub use value::{format_number, Key, Table, Value};
