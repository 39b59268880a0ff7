use mlua::Lua;

use luawidget_bridge::{from_json, to_guest, to_host_data, to_json, CallbackRegistry};

use super::Module;

pub(super) fn install(lua: &Lua) -> mlua::Result<()> {
    let module = Module::new(lua, "json")?;

    module.function("decode", |lua, args| {
        let Some(text) = args.string(0) else {
            return args.reject_nil("decode expects a string");
        };
        match serde_json::from_str::<serde_json::Value>(&text) {
            // Decoded data holds no functions, so the registry stays empty.
            Ok(json) => Ok(to_guest(lua, &from_json(&json), &CallbackRegistry::new())?),
            Err(error) => {
                tracing::debug!(%error, "json.decode failed");
                Ok(mlua::Value::Nil)
            }
        }
    })?;

    module.function("encode", |lua, args| {
        let value = args.get(0).cloned().unwrap_or(mlua::Value::Nil);
        if matches!(
            value,
            mlua::Value::Function(_) | mlua::Value::Thread(_) | mlua::Value::UserData(_)
        ) {
            return args.reject_nil(&format!("cannot encode a {}", value.type_name()));
        }
        let data = match to_host_data(&value) {
            Ok(data) => data,
            Err(error) => return args.reject_nil(&error.to_string()),
        };
        let text = to_json(&data).to_string();
        Ok(mlua::Value::String(lua.create_string(&text)?))
    })?;

    module.install()
}
