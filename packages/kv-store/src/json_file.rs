use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use crate::in_memory::InMemoryStore;
use crate::{KvStore, Result, StoreError};

/// A store persisted as one JSON object file.
///
/// The file is read once on open. Every mutation rewrites it in full by
/// writing a sibling temp file and renaming it over the original, so a
/// crash mid-write leaves the previous contents intact. A mutation whose
/// write fails is not applied in memory either.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    cache: InMemoryStore,
}

impl JsonFileStore {
    /// Open the store at `path`, creating parent directories as needed.
    /// A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| StoreError::Io {
                path: parent.to_path_buf(),
                error,
            })?;
        }

        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => parse(&path, &text)?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => return Err(StoreError::Io { path, error }),
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "opened storage file");

        Ok(Self {
            path,
            cache: InMemoryStore::with_entries(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the entries, write the copy out and only
    /// then adopt it.
    fn commit<R>(&mut self, change: impl FnOnce(&mut InMemoryStore) -> Result<R>) -> Result<R> {
        let mut next = self.cache.clone();
        let outcome = change(&mut next)?;
        self.write(next.entries())?;
        self.cache = next;
        Ok(outcome)
    }

    fn write(&self, entries: &BTreeMap<String, JsonValue>) -> Result<()> {
        let io_error = |error| StoreError::Io {
            path: self.path.clone(),
            error,
        };

        let text = serde_json::to_string_pretty(entries).map_err(|error| StoreError::Serialize {
            path: self.path.clone(),
            error,
        })?;

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let mut file = fs::File::create(&temp_path).map_err(io_error)?;
        file.write_all(text.as_bytes()).map_err(io_error)?;
        file.sync_all().map_err(io_error)?;
        fs::rename(&temp_path, &self.path).map_err(io_error)?;

        tracing::trace!(path = %self.path.display(), "storage file rewritten");
        Ok(())
    }
}

fn parse(path: &Path, text: &str) -> Result<BTreeMap<String, JsonValue>> {
    let value: JsonValue = serde_json::from_str(text).map_err(|error| StoreError::Parse {
        path: path.to_path_buf(),
        error,
    })?;

    match value {
        JsonValue::Object(map) => Ok(map.into_iter().collect()),
        _ => Err(StoreError::NotAnObject {
            path: path.to_path_buf(),
        }),
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<JsonValue> {
        self.cache.get(key)
    }

    fn set(&mut self, key: &str, value: JsonValue) -> Result<()> {
        self.commit(|entries| entries.set(key, value))
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        if !self.cache.has(key) {
            return Ok(false);
        }
        self.commit(|entries| entries.delete(key))
    }

    fn has(&self, key: &str) -> bool {
        self.cache.has(key)
    }

    fn keys(&self) -> Vec<String> {
        self.cache.keys()
    }

    fn clear(&mut self) -> Result<()> {
        self.commit(|entries| entries.clear())
    }
}
