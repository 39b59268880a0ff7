//! Mock fixtures and URL matching.
//!
//! A fixture file is a JSON object mapping request keys to responses:
//!
//! ```json
//! {
//!   "http://192.168.88.1/rest/system/resource": {
//!     "status": 200,
//!     "body": { "total-memory": 1024, "free-memory": 512 }
//!   },
//!   "/api/v1/status": "plain body, status 200"
//! }
//! ```
//!
//! Keys are method-independent. A request URL is matched against them in
//! a fixed order, first hit wins: exact raw URL, credential-stripped URL,
//! path (with then without query), then substring containment either way.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::{NetError, Result};

/// A canned response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockFixture {
    pub status: u16,
    /// Body text; structured bodies are stored JSON-encoded. `None` is
    /// delivered to the guest as `nil`.
    pub body: Option<String>,
}

impl MockFixture {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: Some(body.into()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFixture {
    Full {
        status: u16,
        #[serde(default)]
        body: JsonValue,
    },
    Bare(JsonValue),
}

impl From<RawFixture> for MockFixture {
    fn from(raw: RawFixture) -> Self {
        let (status, body) = match raw {
            RawFixture::Full { status, body } => (status, body),
            RawFixture::Bare(body) => (200, body),
        };
        let body = match body {
            JsonValue::Null => None,
            JsonValue::String(text) => Some(text),
            structured => Some(structured.to_string()),
        };
        MockFixture { status, body }
    }
}

/// Which rule resolved a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Normalized,
    PathOnly,
    Substring,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchKind::Exact => "exact",
            MatchKind::Normalized => "normalized",
            MatchKind::PathOnly => "path",
            MatchKind::Substring => "substring",
        };
        f.write_str(name)
    }
}

/// A successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureMatch {
    pub key: String,
    pub kind: MatchKind,
    pub fixture: MockFixture,
}

/// The fixtures a facade answers mock-mode requests from.
#[derive(Debug, Clone, Default)]
pub struct FixtureSet {
    fixtures: BTreeMap<String, MockFixture>,
}

impl FixtureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> std::result::Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, RawFixture> = serde_json::from_str(text)?;
        Ok(Self {
            fixtures: raw.into_iter().map(|(k, v)| (k, v.into())).collect(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|error| NetError::FixtureIo {
            path: path.to_path_buf(),
            error,
        })?;

        let value: JsonValue = serde_json::from_str(&text).map_err(|error| NetError::FixtureParse {
            path: path.to_path_buf(),
            error,
        })?;
        if !value.is_object() {
            return Err(NetError::FixtureShape);
        }

        let set = Self::from_json_str(&text).map_err(|error| NetError::FixtureParse {
            path: path.to_path_buf(),
            error,
        })?;
        tracing::info!(path = %path.display(), count = set.len(), "loaded fixtures");
        Ok(set)
    }

    pub fn insert(&mut self, key: impl Into<String>, fixture: MockFixture) {
        self.fixtures.insert(key.into(), fixture);
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.fixtures.keys().cloned().collect()
    }

    /// Resolve `url` against the fixtures.
    pub fn lookup(&self, url: &str) -> Option<FixtureMatch> {
        let hit = |key: &String, kind| {
            self.fixtures.get(key).map(|fixture| FixtureMatch {
                key: key.clone(),
                kind,
                fixture: fixture.clone(),
            })
        };

        if let Some(found) = hit(&url.to_string(), MatchKind::Exact) {
            return Some(found);
        }

        let normalized = strip_credentials(url);
        if let Some(key) = self.fixtures.keys().find(|k| strip_credentials(k) == normalized) {
            return hit(key, MatchKind::Normalized);
        }

        if let Some((path, query)) = path_of(&normalized) {
            let candidates = match query {
                Some(q) => vec![format!("{path}?{q}"), path],
                None => vec![path],
            };
            for candidate in candidates {
                if let Some(found) = hit(&candidate, MatchKind::PathOnly) {
                    return Some(found);
                }
            }
        }

        let matches: Vec<&String> = self
            .fixtures
            .keys()
            .filter(|k| {
                let key = strip_credentials(k);
                !key.is_empty() && (normalized.contains(&key) || key.contains(&normalized))
            })
            .collect();
        if matches.len() > 1 {
            tracing::warn!(
                url = %normalized,
                candidates = ?matches,
                "ambiguous fixture match, using the first"
            );
        }
        matches
            .first()
            .copied()
            .and_then(|key| hit(key, MatchKind::Substring))
    }
}

/// Remove `user:password@` from a URL.
pub fn strip_credentials(url: &str) -> String {
    lazy_static! {
        static ref USERINFO: Regex =
            Regex::new(r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.\-]*://)[^/?#@]*@").unwrap();
    }
    USERINFO.replace(url, "$scheme").into_owned()
}

/// Split a URL into its path and optional query.
fn path_of(url: &str) -> Option<(String, Option<String>)> {
    if url.starts_with('/') {
        return Some(match url.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (url.to_string(), None),
        });
    }
    let parsed = url::Url::parse(url).ok()?;
    Some((parsed.path().to_string(), parsed.query().map(str::to_string)))
}
