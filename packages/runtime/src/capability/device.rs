use mlua::Lua;

use super::Module;

/// Device APIs the launcher offers on a phone. The emulator answers with
/// fixed values.
pub(super) fn install(lua: &Lua) -> mlua::Result<()> {
    let module = Module::new(lua, "device")?;

    module.function("battery_info", |lua, _| {
        let info = lua.create_table()?;
        info.set("percent", 100)?;
        info.set("charging", false)?;
        Ok(mlua::Value::Table(info))
    })?;

    module.function("info", |lua, _| {
        let info = lua.create_table()?;
        info.set("model", "emulator")?;
        info.set("os", "luawidget")?;
        info.set("sdk", 0)?;
        Ok(mlua::Value::Table(info))
    })?;

    module.install()
}
