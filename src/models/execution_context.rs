//! Key-value store scoped to a step or job execution.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Mutable map of serializable values attached to an execution.
///
/// Values are held as JSON so any `Serialize` type can be stored and the whole
/// context can be persisted by an
/// [`ExecutionContextSerializer`](crate::repository::ExecutionContextSerializer).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    entries: BTreeMap<String, Value>,
    #[serde(skip)]
    dirty: bool,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: BTreeMap<String, Value>) -> Self {
        Self {
            entries,
            dirty: false,
        }
    }

    /// Store a raw JSON value. Storing `null` removes the key.
    pub fn put_value(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if value.is_null() {
            if self.entries.remove(&key).is_some() {
                self.dirty = true;
            }
            return;
        }
        if self.entries.get(&key) != Some(&value) {
            self.dirty = true;
        }
        self.entries.insert(key, value);
    }

    /// Store any serializable value
    pub fn put<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.put_value(key, value);
        Ok(())
    }

    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.put_value(key, Value::String(value.into()));
    }

    pub fn put_long(&mut self, key: impl Into<String>, value: i64) {
        self.put_value(key, Value::from(value));
    }

    pub fn put_double(&mut self, key: impl Into<String>, value: f64) {
        self.put_value(key, Value::from(value));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        self.entries.get(key).and_then(Value::as_i64)
    }

    pub fn get_double(&self, key: &str) -> Option<f64> {
        self.entries.get(key).and_then(Value::as_f64)
    }

    /// Deserialize the value stored under `key`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_json::Error> {
        self.entries
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the context changed since the last [`clear_dirty`](Self::clear_dirty)
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl PartialEq for ExecutionContext {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_round_trip() {
        let mut ctx = ExecutionContext::new();
        ctx.put_string("user.name", "alice");
        ctx.put_long("count", 42);
        ctx.put_double("ratio", 1.5);

        assert_eq!(ctx.get_string("user.name"), Some("alice"));
        assert_eq!(ctx.get_long("count"), Some(42));
        assert_eq!(ctx.get_double("ratio"), Some(1.5));
        assert_eq!(ctx.get_long("user.name"), None);
    }

    #[test]
    fn test_structured_values() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Cursor {
            page: u32,
            token: String,
        }

        let mut ctx = ExecutionContext::new();
        let cursor = Cursor {
            page: 3,
            token: "abc".into(),
        };
        ctx.put("cursor", &cursor).unwrap();

        let restored: Option<Cursor> = ctx.get_as("cursor").unwrap();
        assert_eq!(restored, Some(cursor));
        assert_eq!(ctx.get_as::<Cursor>("missing").unwrap(), None);
    }

    #[test]
    fn test_dirty_tracking() {
        let mut ctx = ExecutionContext::new();
        assert!(!ctx.is_dirty());

        ctx.put_string("a", "1");
        assert!(ctx.is_dirty());

        ctx.clear_dirty();
        ctx.put_string("a", "1");
        assert!(!ctx.is_dirty(), "rewriting an identical value is not a change");

        ctx.put_value("a", json!(null));
        assert!(ctx.is_dirty());
        assert!(!ctx.contains_key("a"));
    }

    #[test]
    fn test_display_lists_entries() {
        let mut ctx = ExecutionContext::new();
        ctx.put_string("user.name", "bob");
        assert_eq!(ctx.to_string(), "{user.name=\"bob\"}");
    }
}
