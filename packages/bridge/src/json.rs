//! JSON encoding of host values.
//!
//! Tables whose keys are exactly `1..n` become arrays. Every other
//! non-empty table becomes an object with integer keys stringified. An
//! empty table is ambiguous and encodes as `{}`.

use serde_json::{Map, Number};

use crate::convert::MAX_SAFE_INTEGER;
use crate::value::{Table, Value};

/// Encode `value` as JSON. Callables have no JSON form: one at the top
/// level encodes as `null`, one inside a table is left out.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Nil | Value::Callable(_) => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number(*n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Table(t) => table(t),
    }
}

fn number(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        serde_json::Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

fn table(t: &Table) -> serde_json::Value {
    if let Some(items) = t.sequence() {
        return serde_json::Value::Array(
            items
                .into_iter()
                .filter(|v| !matches!(v, Value::Callable(_)))
                .map(to_json)
                .collect(),
        );
    }

    let mut map = Map::new();
    for (key, item) in t.iter() {
        if matches!(item, Value::Callable(_)) {
            continue;
        }
        map.insert(key.to_string(), to_json(item));
    }
    serde_json::Value::Object(map)
}

/// Decode JSON into a host value. Arrays become tables keyed `1..n`;
/// `null` elements leave holes since a table cannot hold nil.
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Nil),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => {
            let mut table = Table::new();
            for (i, item) in items.iter().enumerate() {
                table.insert(i as i64 + 1, from_json(item));
            }
            Value::Table(table)
        }
        serde_json::Value::Object(map) => {
            let mut table = Table::new();
            for (key, item) in map {
                table.insert(key.as_str(), from_json(item));
            }
            Value::Table(table)
        }
    }
}
