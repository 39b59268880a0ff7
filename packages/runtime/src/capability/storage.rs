use std::rc::Rc;

use mlua::Lua;

use luawidget_bridge::{from_json, to_guest, to_json, Table, Value};

use super::{boolean, Module};
use crate::host::GuestState;

pub(super) fn install(lua: &Lua, state: &Rc<GuestState>) -> mlua::Result<()> {
    let module = Module::new(lua, "storage")?;

    let s = state.clone();
    module.function("get", move |lua, args| {
        let Some(key) = args.string(0) else {
            return args.reject_nil("key must be a string");
        };
        let stored = s.services.storage.borrow().get(&key);
        match stored {
            Some(json) => Ok(to_guest(lua, &from_json(&json), &s.callbacks)?),
            None => Ok(mlua::Value::Nil),
        }
    })?;

    let s = state.clone();
    module.function("set", move |_, args| {
        let Some(key) = args.string(0) else {
            return args.reject("key must be a string");
        };
        let Some(value) = args.storable(1) else {
            return boolean(false);
        };
        let result = if value.is_nil() {
            s.services.storage.borrow_mut().delete(&key).map(|_| ())
        } else {
            s.services.storage.borrow_mut().set(&key, to_json(&value))
        };
        match result {
            Ok(()) => boolean(true),
            Err(error) => {
                tracing::warn!(%key, %error, "storage write failed");
                boolean(false)
            }
        }
    })?;

    let s = state.clone();
    module.function("delete", move |_, args| {
        let Some(key) = args.string(0) else {
            return args.reject("key must be a string");
        };
        let removed = s.services.storage.borrow_mut().delete(&key);
        match removed {
            Ok(removed) => boolean(removed),
            Err(error) => {
                tracing::warn!(%key, %error, "storage delete failed");
                boolean(false)
            }
        }
    })?;

    let s = state.clone();
    module.function("has", move |_, args| {
        let Some(key) = args.string(0) else {
            return args.reject("key must be a string");
        };
        let present = s.services.storage.borrow().has(&key);
        boolean(present)
    })?;

    let s = state.clone();
    module.function("keys", move |lua, _| {
        let keys = s.services.storage.borrow().keys();
        let list = Value::Table(Table::from_sequence(keys));
        Ok(to_guest(lua, &list, &s.callbacks)?)
    })?;

    let s = state.clone();
    module.function("clear", move |_, _| {
        let cleared = s.services.storage.borrow_mut().clear();
        match cleared {
            Ok(()) => boolean(true),
            Err(error) => {
                tracing::warn!(%error, "storage clear failed");
                boolean(false)
            }
        }
    })?;

    module.install()
}
