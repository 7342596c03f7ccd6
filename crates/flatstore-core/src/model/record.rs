use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{FlatstoreError, Result};

pub const FIELD_ID: &str = "id";
pub const FIELD_CREATED_AT: &str = "_created_at";
pub const FIELD_UPDATED_AT: &str = "_updated_at";
pub const FIELD_OWNER: &str = "_owner";

/// Prefix of persisted but never externally visible fields
pub const HIDDEN_PREFIX: &str = "__";
/// Prefix of fields only the system may set
pub const RESERVED_PREFIX: &str = "_";

/// One stored document
///
/// An open attribute map; the reserved fields (`id`, `_created_at`,
/// `_updated_at`, `_owner`) are ordinary entries with typed accessors.
/// Field order is preserved as read or written.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a record from a JSON value, which must be an object
    ///
    /// # Errors
    ///
    /// Returns `Serialization` when the value is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(FlatstoreError::Serialization {
                message: format!("record must be a JSON object, got {}", other),
            }),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The record id, when present and a string
    pub fn id(&self) -> Option<&str> {
        self.0.get(FIELD_ID).and_then(Value::as_str)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0.insert(FIELD_ID.to_string(), Value::String(id.into()));
    }

    /// Builder form of [`Record::set_id`]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.set_id(id);
        self
    }

    pub fn created_at(&self) -> Option<&Value> {
        self.0.get(FIELD_CREATED_AT)
    }

    pub fn updated_at(&self) -> Option<&Value> {
        self.0.get(FIELD_UPDATED_AT)
    }

    pub fn owner(&self) -> Option<&str> {
        self.0.get(FIELD_OWNER).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shallow merge: every top-level field of `patch` replaces this record's
    pub fn merge(&mut self, patch: Record) {
        for (k, v) in patch.0 {
            self.0.insert(k, v);
        }
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, &Value) -> bool,
    {
        self.0.retain(|k, v| keep(k, v));
    }
}

pub fn is_hidden_field(name: &str) -> bool {
    name.starts_with(HIDDEN_PREFIX)
}

pub fn is_reserved_field(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = FlatstoreError;

    fn try_from(value: Value) -> Result<Self> {
        Record::from_value(value)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reserved_accessors() {
        let r = Record::from_value(json!({
            "id": "A",
            "_created_at": "2020-01-01T00:00:00.000Z",
            "_owner": "u1",
            "title": "x"
        }))
        .unwrap();
        assert_eq!(r.id(), Some("A"));
        assert_eq!(r.owner(), Some("u1"));
        assert!(r.updated_at().is_none());
        assert_eq!(r.created_at(), Some(&json!("2020-01-01T00:00:00.000Z")));
    }

    #[test]
    fn test_non_string_id_is_absent() {
        let r = Record::from_value(json!({ "id": 3 })).unwrap();
        assert_eq!(r.id(), None);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Record::from_value(json!([1, 2])).is_err());
        assert!(Record::try_from(json!("x")).is_err());
    }

    #[test]
    fn test_merge_is_shallow() {
        let mut r = Record::from_value(json!({ "a": { "x": 1 }, "b": 1 })).unwrap();
        r.merge(Record::from_value(json!({ "a": { "y": 2 } })).unwrap());
        assert_eq!(r.get("a"), Some(&json!({ "y": 2 })));
        assert_eq!(r.get("b"), Some(&json!(1)));
    }

    #[test]
    fn test_field_prefixes() {
        assert!(is_hidden_field("__secret"));
        assert!(!is_hidden_field("_owner"));
        assert!(is_reserved_field("_owner"));
        assert!(is_reserved_field("__secret"));
        assert!(!is_reserved_field("title"));
    }

    #[test]
    fn test_serializes_transparently() {
        let r = Record::new().with_id("A");
        assert_eq!(serde_json::to_value(&r).unwrap(), json!({ "id": "A" }));
    }
}
