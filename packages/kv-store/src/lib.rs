//! Key-value storage for widget scripts.
//!
//! Widgets persist small bits of state (last poll time, a cached token)
//! between runs. Keys are strings and values are JSON; the runtime's
//! `storage` capability converts guest values through the same JSON
//! encoding the `json` capability uses.
//!
//! - [`InMemoryStore`] keeps everything in a map and forgets it on drop.
//! - [`JsonFileStore`] mirrors the map into a single JSON object file,
//!   rewritten in full after every mutation.

mod error;
mod in_memory;
mod json_file;

pub use error::{Result, StoreError};
pub use in_memory::InMemoryStore;
pub use json_file::JsonFileStore;

use serde_json::Value as JsonValue;

/// A string-keyed store of JSON values.
///
/// Setting a key overwrites it (last write wins). Reads of a missing key
/// are `None`, not an error.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<JsonValue>;

    fn set(&mut self, key: &str, value: JsonValue) -> Result<()>;

    /// Remove `key`, returning whether it was present.
    fn delete(&mut self, key: &str) -> Result<bool>;

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All keys in ascending order.
    fn keys(&self) -> Vec<String>;

    fn clear(&mut self) -> Result<()>;
}
