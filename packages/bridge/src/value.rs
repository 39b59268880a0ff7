//! The host-side model of a guest value.

use std::collections::BTreeMap;
use std::fmt;

use crate::callback::CallbackHandle;

/// A guest value held by the host.
///
/// Host copies never alias interpreter memory. Functions are the one
/// exception, and they only cross as an opaque [`CallbackHandle`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Table(Table),
    Callable(CallbackHandle),
}

impl Value {
    /// The guest-facing type name, as Lua's `type()` would report it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Table(_) => "table",
            Value::Callable(_) => "function",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Lua truthiness: everything except `nil` and `false`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The number as an integer, if it has no fractional part.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<CallbackHandle> {
        match self {
            Value::Callable(h) => Some(*h),
            _ => None,
        }
    }

    /// A short, single-line rendering for log fields.
    pub fn summary(&self) -> String {
        const LIMIT: usize = 60;
        let full = self.to_string();
        if full.chars().count() <= LIMIT {
            full
        } else {
            let mut cut: String = full.chars().take(LIMIT).collect();
            cut.push_str("...");
            cut
        }
    }
}

/// Format a number the way a guest would print it: integral values without
/// a fractional part, everything else in shortest round-trip form.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "inf" } else { "-inf" };
        text.to_string()
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Table(t) => write!(f, "{}", t),
            Value::Callable(h) => write!(f, "{}", h),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Table> for Value {
    fn from(t: Table) -> Self {
        Value::Table(t)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Nil)
    }
}

/// A table key. Guest tables may be keyed by anything, but only integers
/// and strings survive the crossing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Index(i64),
    Field(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{}", i),
            Key::Field(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Index(i)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Field(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Field(s)
    }
}

/// An ordered table: integer keys ascend numerically, string keys keep
/// insertion order. Nil values are never stored.
#[derive(Debug, Clone, Default)]
pub struct Table {
    array: BTreeMap<i64, Value>,
    fields: Vec<(String, Value)>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an array-like table with keys `1..=n`.
    pub fn from_sequence<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut table = Table::new();
        for (i, item) in items.into_iter().enumerate() {
            table.insert(i as i64 + 1, item.into());
        }
        table
    }

    /// Set `key` to `value`. Setting `Nil` removes the key.
    pub fn insert(&mut self, key: impl Into<Key>, value: impl Into<Value>) {
        let value = value.into();
        match key.into() {
            Key::Index(i) => {
                if value.is_nil() {
                    self.array.remove(&i);
                } else {
                    self.array.insert(i, value);
                }
            }
            Key::Field(name) => {
                let existing = self.fields.iter().position(|(k, _)| *k == name);
                match (existing, value.is_nil()) {
                    (Some(pos), true) => {
                        self.fields.remove(pos);
                    }
                    (Some(pos), false) => self.fields[pos].1 = value,
                    (None, true) => {}
                    (None, false) => self.fields.push((name, value)),
                }
            }
        }
    }

    pub fn get(&self, key: &Key) -> Option<&Value> {
        match key {
            Key::Index(i) => self.array.get(i),
            Key::Field(name) => self.field(name),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn index(&self, i: i64) -> Option<&Value> {
        self.array.get(&i)
    }

    pub fn len(&self) -> usize {
        self.array.len() + self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty() && self.fields.is_empty()
    }

    /// Integer-keyed entries in ascending key order.
    pub fn array(&self) -> impl Iterator<Item = (i64, &Value)> {
        self.array.iter().map(|(k, v)| (*k, v))
    }

    /// String-keyed entries in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every entry, integer keys first.
    pub fn iter(&self) -> impl Iterator<Item = (Key, &Value)> {
        self.array()
            .map(|(k, v)| (Key::Index(k), v))
            .chain(self.fields().map(|(k, v)| (Key::Field(k.to_string()), v)))
    }

    /// True when the keys are exactly `1..=n` for some `n >= 1`.
    pub fn is_sequence(&self) -> bool {
        !self.array.is_empty()
            && self.fields.is_empty()
            && self.array.keys().zip(1..).all(|(k, expected)| *k == expected)
    }

    /// The values of a sequence table in order, or `None` if the table is
    /// not a sequence.
    pub fn sequence(&self) -> Option<Vec<&Value>> {
        self.is_sequence().then(|| self.array.values().collect())
    }

    /// Values at keys `1, 2, ...` up to the first gap, ignoring other keys.
    /// This is what Lua's `ipairs` would visit.
    pub fn ipairs(&self) -> impl Iterator<Item = &Value> {
        (1..).map_while(move |i| self.array.get(&i))
    }
}

impl PartialEq for Table {
    // Field order is not semantic: the interpreter iterates string keys in
    // hash order, so two equal tables can disagree on it.
    fn eq(&self, other: &Self) -> bool {
        self.array == other.array
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .all(|(k, v)| other.field(k).is_some_and(|o| o == v))
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(items) = self.sequence() {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_nested(f, item)?;
            }
            return write!(f, "]");
        }
        write!(f, "{{")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: ", key)?;
            write_nested(f, value)?;
        }
        write!(f, "}}")
    }
}

fn write_nested(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "{:?}", s),
        other => write!(f, "{}", other),
    }
}
