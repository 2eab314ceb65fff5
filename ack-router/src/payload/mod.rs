//! Payload decoding and classification.
//!
//! ## Processing Flow
//!
//! ```text
//! raw body → parse() → Payload → classify() → PayloadIdentity
//! ```

pub mod classify;
pub mod parser;

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

pub use classify::{classify, PayloadType};
pub use parser::parse;

/// Decoded request payload: a JSON object with string keys.
///
/// Read-only once parsed. Lookups return `None` on absent or mistyped
/// fields instead of panicking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Walk nested objects by key. Array elements are addressed by their
    /// decimal index, e.g. `["actions", "0", "action_id"]`.
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.0.get(*first)?;

        for segment in rest {
            current = match current {
                Value::Object(map) => map.get(*segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(current)
    }

    /// String value at `path`, if present and a string.
    pub fn str_at(&self, path: &[&str]) -> Option<&str> {
        self.get_path(path)?.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// The `(type, id)` pair a payload is routed by. Both parts are non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PayloadIdentity {
    pub kind: String,
    pub id: String,
}

impl fmt::Display for PayloadIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
