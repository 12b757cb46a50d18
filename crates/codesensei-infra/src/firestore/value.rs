//! Firestore REST document and value encoding.
//!
//! Firestore wraps every field in a single-key object naming its type
//! (`{"stringValue": "..."}`), which maps directly onto an externally
//! tagged serde enum.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A typed Firestore field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// int64 values travel as decimal strings.
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(serde_json::Value),
    MapValue(MapValue),
    ArrayValue(ArrayValue),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::StringValue(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::StringValue(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::TimestampValue(ts) => parse_timestamp(ts),
            _ => None,
        }
    }
}

/// A Firestore document as returned by the REST API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name: `projects/{p}/databases/{d}/documents/{path}`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
    #[serde(default, skip_serializing)]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing)]
    pub update_time: Option<String>,
}

impl Document {
    /// The last path segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn get_timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        self.fields.get(field).and_then(Value::as_timestamp)
    }

    /// Document creation time as recorded by Firestore.
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.create_time.as_deref().and_then(parse_timestamp)
    }
}

/// Parse an RFC 3339 timestamp as Firestore emits it (nanosecond precision).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_wire_shape() {
        assert_eq!(
            serde_json::to_value(Value::string("hi")).unwrap(),
            json!({"stringValue": "hi"})
        );
        assert_eq!(
            serde_json::to_value(Value::NullValue(())).unwrap(),
            json!({"nullValue": null})
        );
    }

    #[test]
    fn test_document_decodes_mixed_fields() {
        let doc: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/users/u1/sessions/Loops 101",
            "fields": {
                "name": {"stringValue": "Loops 101"},
                "created_at": {"timestampValue": "2025-03-01T10:15:30.123456Z"},
                "pinned": {"booleanValue": true},
                "count": {"integerValue": "3"},
                "tags": {"arrayValue": {"values": [{"stringValue": "rust"}]}},
                "meta": {"mapValue": {}},
                "gone": {"nullValue": null}
            },
            "createTime": "2025-03-01T10:15:30.123456789Z",
            "updateTime": "2025-03-01T10:15:30.123456789Z"
        }))
        .unwrap();

        assert_eq!(doc.id(), "Loops 101");
        assert_eq!(doc.get_str("name"), Some("Loops 101"));
        assert_eq!(doc.get_str("pinned"), None);
        let created = doc.get_timestamp("created_at").unwrap();
        assert_eq!(created.to_rfc3339(), "2025-03-01T10:15:30.123456+00:00");
        assert!(doc.created().is_some());
    }

    #[test]
    fn test_document_serializes_without_read_only_fields() {
        let mut doc = Document {
            name: "projects/p/databases/(default)/documents/a/b".to_string(),
            create_time: Some("2025-01-01T00:00:00Z".to_string()),
            ..Document::default()
        };
        doc.fields.insert("role".to_string(), Value::string("user"));

        let body = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "projects/p/databases/(default)/documents/a/b",
                "fields": {"role": {"stringValue": "user"}}
            })
        );
    }
}
