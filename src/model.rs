//! # Data Model
//!
//! Core data structures for record reconciliation: opaque document ids,
//! scalar field values, and records carrying a natural key plus an open set
//! of named attributes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;

/// A UTC instant as epoch seconds.
/// Using i64 to support both past and future times, and to avoid floating point issues.
pub type Timestamp = i64;

/// Current UTC time as epoch seconds.
pub fn now() -> Timestamp {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Opaque identifier assigned by the entity store on creation.
///
/// Never set by callers; a record has no id before its first persistence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocId(pub String);

impl DocId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A scalar field value.
///
/// Extension fields are discovered at ingestion time, so the value space is a
/// closed set of scalar kinds rather than an open-ended dynamic object. The
/// untagged representation round-trips through JSON documents unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// Whether this value counts as populated for completeness scoring.
    ///
    /// Text is populated when non-empty after trimming; a number when finite
    /// and greater than zero (zero amounts carry no information); a boolean
    /// whenever present, since a recorded `false` is still information.
    pub fn is_populated(&self) -> bool {
        match self {
            Self::Text(text) => !text.trim().is_empty(),
            Self::Number(number) => number.is_finite() && *number > 0.0,
            Self::Bool(_) => true,
        }
    }

    /// The text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Number(number) => write!(f, "{number}"),
            Self::Bool(flag) => write!(f, "{flag}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Ordered map of named attributes.
///
/// Core and extension fields share this representation; the engine treats
/// them uniformly and a stable key order keeps serialized documents
/// deterministic.
pub type FieldMap = BTreeMap<String, Value>;

/// The unit managed by the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned identifier; `None` before first persistence.
    pub id: Option<DocId>,
    /// Named attributes, including the natural key field.
    pub fields: FieldMap,
    /// Fixed at first insert; engine-owned.
    pub created_at: Timestamp,
    /// Refreshed on every successful write; monotonically non-decreasing.
    pub updated_at: Timestamp,
}

impl Record {
    /// Create an empty, unpersisted record.
    pub fn new() -> Self {
        Self {
            id: None,
            fields: FieldMap::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Create an unpersisted record from a field map.
    pub fn with_fields(fields: FieldMap) -> Self {
        Self {
            id: None,
            fields,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Get a field value by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set a field value, replacing any previous value under the same name.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Chainable text field setter.
    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), Value::Text(value.into()));
        self
    }

    /// Chainable numeric field setter.
    pub fn with_number(mut self, name: impl Into<String>, value: f64) -> Self {
        self.fields.insert(name.into(), Value::Number(value));
        self
    }

    /// Chainable boolean field setter.
    pub fn with_bool(mut self, name: impl Into<String>, value: bool) -> Self {
        self.fields.insert(name.into(), Value::Bool(value));
        self
    }

    /// The natural key stored under `key_field`, if present and textual.
    pub fn natural_key(&self, key_field: &str) -> Option<&str> {
        self.fields.get(key_field).and_then(Value::as_text)
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_populated_rules() {
        assert!(Value::Text("M1".to_string()).is_populated());
        assert!(!Value::Text("".to_string()).is_populated());
        assert!(!Value::Text("   ".to_string()).is_populated());
        assert!(Value::Number(120.5).is_populated());
        assert!(!Value::Number(0.0).is_populated());
        assert!(!Value::Number(-3.0).is_populated());
        assert!(!Value::Number(f64::NAN).is_populated());
        assert!(Value::Bool(true).is_populated());
        assert!(Value::Bool(false).is_populated());
    }

    #[test]
    fn test_value_untagged_round_trip() {
        let mut fields = FieldMap::new();
        fields.insert("codigo".to_string(), Value::Text("M1".to_string()));
        fields.insert("precio".to_string(), Value::Number(1500.0));
        fields.insert("activo".to_string(), Value::Bool(true));

        let json = serde_json::to_string(&fields).unwrap();
        let back: FieldMap = serde_json::from_str(&json).unwrap();
        assert_eq!(fields, back);
    }

    #[test]
    fn test_untagged_value_kinds_from_json() {
        let parsed: FieldMap =
            serde_json::from_str(r#"{"a": "text", "b": 2.5, "c": false}"#).unwrap();
        assert_eq!(parsed["a"], Value::Text("text".to_string()));
        assert_eq!(parsed["b"], Value::Number(2.5));
        assert_eq!(parsed["c"], Value::Bool(false));
    }

    #[test]
    fn test_record_natural_key() {
        let record = Record::new().with_text("codigo", "M1");
        assert_eq!(record.natural_key("codigo"), Some("M1"));
        assert_eq!(record.natural_key("other"), None);

        let numeric = Record::new().with_number("codigo", 7.0);
        assert_eq!(numeric.natural_key("codigo"), None);
    }

    #[test]
    fn test_record_field_setters() {
        let mut record = Record::new();
        record.set_field("estado", "STOCK");
        record.set_field("estado", "VENDIDO");
        assert_eq!(
            record.field("estado"),
            Some(&Value::Text("VENDIDO".to_string()))
        );
    }
}
