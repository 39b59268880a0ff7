use std::rc::Rc;

use mlua::{Lua, MultiValue};

use super::{guest_tostring, Module};
use crate::host::GuestState;

/// `log.debug|info|warn|error(...)` and the global `print`, all routed to
/// host tracing under the `guest` target.
pub(super) fn install(lua: &Lua, state: &Rc<GuestState>) -> mlua::Result<()> {
    let module = Module::new(lua, "log")?;

    for level in ["debug", "info", "warn", "error"] {
        let s = state.clone();
        module.function(level, move |lua, args| {
            let message = join(lua, args.rest(0));
            emit(level, &s.chunk, &message);
            Ok(mlua::Value::Nil)
        })?;
    }
    module.install()?;

    let s = state.clone();
    let print = lua.create_function(move |lua, args: MultiValue| {
        let values = args.into_vec();
        emit("info", &s.chunk, &join(lua, &values));
        Ok(())
    })?;
    lua.globals().set("print", print)
}

fn join(lua: &Lua, values: &[mlua::Value]) -> String {
    values
        .iter()
        .map(|v| guest_tostring(lua, v))
        .collect::<Vec<_>>()
        .join("\t")
}

fn emit(level: &str, chunk: &str, message: &str) {
    match level {
        "debug" => tracing::debug!(target: "guest", chunk, "{message}"),
        "warn" => tracing::warn!(target: "guest", chunk, "{message}"),
        "error" => tracing::error!(target: "guest", chunk, "{message}"),
        _ => tracing::info!(target: "guest", chunk, "{message}"),
    }
}
