use std::fmt::Write;
use std::rc::Rc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mlua::Lua;

use super::{boolean, Module};
use crate::host::GuestState;

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(super) fn install(lua: &Lua, state: &Rc<GuestState>) -> mlua::Result<()> {
    let module = Module::new(lua, "system")?;

    let s = state.clone();
    module.function("open_browser", move |_, args| {
        let Some(url) = args.string(0) else {
            return args.reject("url must be a string");
        };
        tracing::info!(chunk = %s.chunk, %url, "open browser");
        s.surface.borrow_mut().opened_urls.push(url);
        boolean(true)
    })?;

    let s = state.clone();
    module.function("toast", move |_, args| {
        let Some(message) = args.string(0) else {
            return args.reject("message must be a string");
        };
        tracing::info!(chunk = %s.chunk, %message, "toast");
        s.surface.borrow_mut().toasts.push(message);
        boolean(true)
    })?;

    module.function("clock", |_, _| {
        Ok(mlua::Value::Integer(Utc::now().timestamp()))
    })?;

    module.function("date", |lua, args| {
        let format = args.string(0).unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
        let at = match args.integer(1) {
            Some(seconds) => match Utc.timestamp_opt(seconds, 0).single() {
                Some(utc) => utc.with_timezone(&Local),
                None => return args.reject_nil("time out of range"),
            },
            None => Local::now(),
        };
        match format_date(&at, &format) {
            Some(text) => Ok(mlua::Value::String(lua.create_string(&text)?)),
            None => args.reject_nil(&format!("invalid date format {format:?}")),
        }
    })?;

    module.install()
}

/// strftime formatting; `None` for a format chrono rejects.
fn format_date<Tz: TimeZone>(at: &DateTime<Tz>, format: &str) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    write!(out, "{}", at.format(format)).ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostServices;

    fn lua_with_system() -> (Lua, Rc<GuestState>) {
        let lua = Lua::new();
        let state = Rc::new(GuestState::new("system-test", HostServices::in_memory()));
        install(&lua, &state).unwrap();
        (lua, state)
    }

    #[test]
    fn browser_and_toasts_are_recorded() {
        let (lua, state) = lua_with_system();
        lua.load(r#"system:open_browser("http://nas.local") system.toast("hi")"#)
            .exec()
            .unwrap();
        let surface = state.surface.borrow();
        assert_eq!(surface.opened_urls, vec!["http://nas.local"]);
        assert_eq!(surface.toasts, vec!["hi"]);
    }

    #[test]
    fn clock_is_unix_seconds() {
        let (lua, _) = lua_with_system();
        let now: i64 = lua.load("return system.clock()").eval().unwrap();
        assert!((now - Utc::now().timestamp()).abs() < 5);
    }

    #[test]
    fn date_formats_given_time() {
        let (lua, _) = lua_with_system();
        let year: String = lua.load(r#"return system.date("%Y", 86400 * 400)"#).eval().unwrap();
        assert_eq!(year, "1971");
    }

    #[test]
    fn invalid_format_is_nil() {
        let at = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(format_date(&at, "%Y").as_deref(), Some("1970"));
        assert_eq!(format_date(&at, "%Q"), None);
    }
}
