//! The in-memory log record and its enrichment operations.
//!
//! Enrichment never fails outward: when a key cannot be inserted the failure
//! itself is stored in the context under an `[add failed]` marker.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::{DbLogError, Result};

pub const UID_KEY: &str = "uid";
pub const DESCRIPTION_KEY: &str = "description";
pub const ADD_FAILED_PREFIX: &str = "[add failed] ";

/// One structured diagnostic record.
///
/// Entries are created by the builder functions, enriched through the
/// consuming `add`/`describe` methods and handed by value to the commit
/// pipeline, which is why the type is deliberately not `Clone`.
#[derive(Debug, Serialize)]
pub struct LogEntry {
    category: String,
    title: String,
    body: String,
    context: Map<String, Value>,
}

impl LogEntry {
    pub(crate) fn new(category: String, title: String, body: String) -> Self {
        Self {
            category,
            title,
            body,
            context: Map::new(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Auxiliary context in insertion order.
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Attach `key -> value`. A null value is stored as the string `"null"`.
    pub fn add(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = match value.into() {
            Value::Null => Value::String("null".into()),
            other => other,
        };
        if let Err(err) = self.try_insert(&key, value) {
            self.record_failure(&key, &err);
        }
        self
    }

    /// Attach an arbitrary serializable value under `key`.
    pub fn add_value<T: Serialize + ?Sized>(mut self, key: impl Into<String>, value: &T) -> Self {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => self.add(key, value),
            Err(err) => {
                self.record_failure(&key, &DbLogError::from(err));
                self
            }
        }
    }

    /// Shorthand for `add("description", text)`.
    pub fn describe(self, text: impl Into<Value>) -> Self {
        self.add(DESCRIPTION_KEY, text)
    }

    /// Render the context as the JSON text stored alongside the entry.
    pub fn context_json(&self) -> Result<String> {
        serialize(&self.context)
    }

    pub(crate) fn seed_uid(&mut self, uid: String) {
        if !self.context.contains_key(UID_KEY) {
            self.context.insert(UID_KEY.to_string(), Value::String(uid));
        }
    }

    fn try_insert(&mut self, key: &str, value: Value) -> Result<()> {
        if key.is_empty() {
            return Err(DbLogError::InvalidKey);
        }
        if self.context.contains_key(key) {
            return Err(DbLogError::DuplicateKey(key.to_string()));
        }
        self.context.insert(key.to_string(), value);
        Ok(())
    }

    fn record_failure(&mut self, key: &str, err: &DbLogError) {
        let marker = self.next_failure_key(key);
        self.context.insert(marker, Value::String(err.to_string()));
    }

    // Markers never overwrite each other: the first failure for `key` uses the
    // bare marker, later ones get a running suffix.
    fn next_failure_key(&self, key: &str) -> String {
        let base = format!("{ADD_FAILED_PREFIX}{key}");
        if !self.context.contains_key(&base) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base} ({n})");
            if !self.context.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Serialize any value to its JSON text.
pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}
