//! Deep-copy conversions between [`Value`] and `mlua::Value`.

use mlua::{Lua, MultiValue};

use crate::callback::CallbackRegistry;
use crate::error::{BridgeError, Result};
use crate::value::{Key, Table, Value};

/// Deepest table nesting followed in either direction.
pub const MAX_DEPTH: usize = 64;

/// 2^53: integral numbers up to this magnitude are exact in an f64 and
/// are handed to the guest as integers.
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Copy a host value into the interpreter.
///
/// A `Callable` whose handle has been released becomes `nil`.
pub fn to_guest(lua: &Lua, value: &Value, callbacks: &CallbackRegistry) -> Result<mlua::Value> {
    guest_value(lua, value, callbacks, 0)
}

/// Convert a whole argument list.
pub fn args_to_guest(lua: &Lua, args: &[Value], callbacks: &CallbackRegistry) -> Result<MultiValue> {
    let values = args
        .iter()
        .map(|arg| to_guest(lua, arg, callbacks))
        .collect::<Result<Vec<_>>>()?;
    Ok(MultiValue::from_vec(values))
}

fn guest_value(
    lua: &Lua,
    value: &Value,
    callbacks: &CallbackRegistry,
    depth: usize,
) -> Result<mlua::Value> {
    if depth > MAX_DEPTH {
        return Err(BridgeError::TooDeep { limit: MAX_DEPTH });
    }

    Ok(match value {
        Value::Nil => mlua::Value::Nil,
        Value::Bool(b) => mlua::Value::Boolean(*b),
        Value::Number(n) => guest_number(*n),
        Value::String(s) => mlua::Value::String(lua.create_string(s)?),
        Value::Table(t) => {
            let table = lua.create_table()?;
            for (index, item) in t.array() {
                table.raw_set(index, guest_value(lua, item, callbacks, depth + 1)?)?;
            }
            for (name, item) in t.fields() {
                table.raw_set(name, guest_value(lua, item, callbacks, depth + 1)?)?;
            }
            mlua::Value::Table(table)
        }
        Value::Callable(handle) => match callbacks.function(lua, *handle) {
            Some(function) => mlua::Value::Function(function),
            None => {
                tracing::debug!(%handle, "released callback crosses as nil");
                mlua::Value::Nil
            }
        },
    })
}

fn guest_number(n: f64) -> mlua::Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        mlua::Value::Integer(n as mlua::Integer)
    } else {
        mlua::Value::Number(n)
    }
}

/// Copy a guest value into the host. Functions are retained in
/// `callbacks` and arrive as [`Value::Callable`].
pub fn to_host(lua: &Lua, value: &mlua::Value, callbacks: &CallbackRegistry) -> Result<Value> {
    host_value(value, Some((lua, callbacks)), 0)
}

/// Copy a guest value into the host as plain data. Functions are dropped,
/// so a table field holding one is absent from the result.
pub fn to_host_data(value: &mlua::Value) -> Result<Value> {
    host_value(value, None, 0)
}

/// Convert a whole return list.
pub fn values_to_host(lua: &Lua, values: MultiValue, callbacks: &CallbackRegistry) -> Result<Vec<Value>> {
    values
        .into_vec()
        .iter()
        .map(|v| to_host(lua, v, callbacks))
        .collect()
}

fn host_value(
    value: &mlua::Value,
    retain: Option<(&Lua, &CallbackRegistry)>,
    depth: usize,
) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(BridgeError::TooDeep { limit: MAX_DEPTH });
    }

    Ok(match value {
        mlua::Value::Nil => Value::Nil,
        mlua::Value::Boolean(b) => Value::Bool(*b),
        mlua::Value::Integer(i) => Value::Number(*i as f64),
        mlua::Value::Number(n) => Value::Number(*n),
        mlua::Value::String(s) => Value::String(s.to_string_lossy().to_string()),
        mlua::Value::Table(t) => {
            let mut table = Table::new();
            for pair in t.clone().pairs::<mlua::Value, mlua::Value>() {
                let (key, item) = pair?;
                let Some(key) = host_key(&key) else {
                    tracing::debug!(key_type = key.type_name(), "skipping unsupported table key");
                    continue;
                };
                table.insert(key, host_value(&item, retain, depth + 1)?);
            }
            Value::Table(table)
        }
        mlua::Value::Function(f) => match retain {
            Some((lua, callbacks)) => Value::Callable(callbacks.retain(lua, f.clone())?),
            None => Value::Nil,
        },
        other => {
            tracing::debug!(value_type = other.type_name(), "unsupported guest value crosses as nil");
            Value::Nil
        }
    })
}

fn host_key(key: &mlua::Value) -> Option<Key> {
    match key {
        mlua::Value::Integer(i) => Some(Key::Index(*i)),
        mlua::Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
            Some(Key::Index(*n as i64))
        }
        mlua::Value::String(s) => Some(Key::Field(s.to_string_lossy().to_string())),
        _ => None,
    }
}
