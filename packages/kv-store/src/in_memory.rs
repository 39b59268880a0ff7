use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::{KvStore, Result};

/// A store that lives only as long as the process.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    entries: BTreeMap<String, JsonValue>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: BTreeMap<String, JsonValue>) -> Self {
        Self { entries }
    }

    pub(crate) fn entries(&self) -> &BTreeMap<String, JsonValue> {
        &self.entries
    }
}

impl KvStore for InMemoryStore {
    fn get(&self, key: &str) -> Option<JsonValue> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: JsonValue) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}
