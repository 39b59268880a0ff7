//! Host capabilities installed into every guest as global tables.
//!
//! Each capability is a plain Lua table of host functions. The guest may
//! call them dot style (`ui.show_text("x")`) or colon style
//! (`ui:show_text("x")`); colon calls pass the module table as an extra
//! first argument, which [`Module`] recognises by identity and drops.
//!
//! Capability functions never raise into the guest. Misuse (a wrong
//! argument type, a missing argument) is logged and answered with `nil`
//! or `false`.

mod device;
mod files;
mod http;
mod json;
mod log;
mod storage;
mod system;
mod ui;

use std::rc::Rc;

use mlua::{Lua, MultiValue};

use luawidget_bridge::{to_host_data, Value};

use crate::host::GuestState;

/// Install every capability into `lua`.
pub(crate) fn install(lua: &Lua, state: &Rc<GuestState>) -> mlua::Result<()> {
    ui::install(lua, state)?;
    http::install(lua, state)?;
    json::install(lua)?;
    storage::install(lua, state)?;
    files::install(lua, state)?;
    system::install(lua, state)?;
    device::install(lua)?;
    log::install(lua, state)?;
    Ok(())
}

/// A capability table under construction.
pub(crate) struct Module<'a> {
    lua: &'a Lua,
    name: &'static str,
    table: mlua::Table,
}

impl<'a> Module<'a> {
    pub(crate) fn new(lua: &'a Lua, name: &'static str) -> mlua::Result<Self> {
        Ok(Self {
            lua,
            name,
            table: lua.create_table()?,
        })
    }

    /// Register `function` as `name` on this module.
    pub(crate) fn function<F>(&self, name: &'static str, function: F) -> mlua::Result<()>
    where
        F: Fn(&Lua, Args) -> mlua::Result<mlua::Value> + 'static,
    {
        let module = self.name;
        let identity = self.table.to_pointer() as usize;

        let host_fn = self.lua.create_function(move |lua, args: MultiValue| {
            let mut values = args.into_vec();
            let is_self = matches!(
                values.first(),
                Some(mlua::Value::Table(t)) if t.to_pointer() as usize == identity
            );
            if is_self {
                values.remove(0);
            }

            let args = Args {
                module,
                function: name,
                values,
            };
            match function(lua, args) {
                Ok(value) => Ok(value),
                Err(error) => {
                    tracing::warn!(module, function = name, %error, "capability call failed");
                    Ok(mlua::Value::Nil)
                }
            }
        })?;

        self.table.set(name, host_fn)
    }

    /// Publish the module as a global.
    pub(crate) fn install(self) -> mlua::Result<()> {
        self.lua.globals().set(self.name, self.table)
    }
}

/// Arguments of one capability call, with any `self` already removed.
pub(crate) struct Args {
    module: &'static str,
    function: &'static str,
    values: Vec<mlua::Value>,
}

impl Args {
    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&mlua::Value> {
        self.values.get(index)
    }

    /// Arguments from `index` on.
    pub(crate) fn rest(&self, index: usize) -> &[mlua::Value] {
        self.values.get(index..).unwrap_or(&[])
    }

    pub(crate) fn is_nil(&self, index: usize) -> bool {
        matches!(self.get(index), None | Some(mlua::Value::Nil))
    }

    /// A string argument. Numbers are accepted the way Lua coerces them.
    pub(crate) fn string(&self, index: usize) -> Option<String> {
        match self.get(index)? {
            mlua::Value::String(s) => Some(s.to_string_lossy().to_string()),
            mlua::Value::Integer(i) => Some(i.to_string()),
            mlua::Value::Number(n) => Some(luawidget_bridge::format_number(*n)),
            _ => None,
        }
    }

    /// A number argument. Numeric strings are accepted.
    pub(crate) fn number(&self, index: usize) -> Option<f64> {
        match self.get(index)? {
            mlua::Value::Integer(i) => Some(*i as f64),
            mlua::Value::Number(n) => Some(*n),
            mlua::Value::String(s) => s.to_string_lossy().trim().parse().ok(),
            _ => None,
        }
    }

    pub(crate) fn integer(&self, index: usize) -> Option<i64> {
        self.number(index)
            .filter(|n| n.fract() == 0.0)
            .map(|n| n as i64)
    }

    pub(crate) fn truthy(&self, index: usize) -> bool {
        !matches!(
            self.get(index),
            None | Some(mlua::Value::Nil) | Some(mlua::Value::Boolean(false))
        )
    }

    /// Copy argument `index` into the host as plain data.
    pub(crate) fn data(&self, index: usize) -> Value {
        match self.get(index) {
            Some(value) => to_host_data(value).unwrap_or_else(|error| {
                self.misuse(&format!("argument {} not convertible: {error}", index + 1));
                Value::Nil
            }),
            None => Value::Nil,
        }
    }

    /// Argument `index` as a value that can be stored. A missing argument
    /// or `nil` is [`Value::Nil`]. Functions, threads, userdata and tables
    /// that cannot be copied (too deep or cyclic) are misuse and give `None`.
    pub(crate) fn storable(&self, index: usize) -> Option<Value> {
        let value = match self.get(index) {
            None | Some(mlua::Value::Nil) => return Some(Value::Nil),
            Some(
                value @ (mlua::Value::Boolean(_)
                | mlua::Value::Integer(_)
                | mlua::Value::Number(_)
                | mlua::Value::String(_)
                | mlua::Value::Table(_)),
            ) => value,
            Some(other) => {
                self.misuse(&format!(
                    "argument {} cannot be stored: {}",
                    index + 1,
                    other.type_name()
                ));
                return None;
            }
        };
        match to_host_data(value) {
            Ok(data) => Some(data),
            Err(error) => {
                self.misuse(&format!("argument {} not convertible: {error}", index + 1));
                None
            }
        }
    }

    /// Log a misuse of this function.
    pub(crate) fn misuse(&self, problem: &str) {
        tracing::warn!(
            module = self.module,
            function = self.function,
            "capability misuse: {problem}"
        );
    }

    /// Log a misuse and answer `false`.
    pub(crate) fn reject(&self, problem: &str) -> mlua::Result<mlua::Value> {
        self.misuse(problem);
        Ok(mlua::Value::Boolean(false))
    }

    /// Log a misuse and answer `nil`.
    pub(crate) fn reject_nil(&self, problem: &str) -> mlua::Result<mlua::Value> {
        self.misuse(problem);
        Ok(mlua::Value::Nil)
    }
}

pub(crate) fn boolean(value: bool) -> mlua::Result<mlua::Value> {
    Ok(mlua::Value::Boolean(value))
}

/// The guest's own `tostring` of `value`.
pub(crate) fn guest_tostring(lua: &Lua, value: &mlua::Value) -> String {
    let tostring: mlua::Result<mlua::Function> = lua.globals().get("tostring");
    let converted = tostring.and_then(|f| f.call::<mlua::String>(value.clone()));
    match converted {
        Ok(s) => s.to_string_lossy().to_string(),
        Err(_) => value.type_name().to_string(),
    }
}

/// Strings of every entry of a guest list, in `ipairs` order.
pub(crate) fn string_list(value: &Value) -> Option<Vec<String>> {
    let table = value.as_table()?;
    Some(table.ipairs().map(crate::render::cell).collect())
}
