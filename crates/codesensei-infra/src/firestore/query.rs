//! Request and response bodies for `:runQuery` and `:commit`.

use serde::{Deserialize, Serialize};

use super::value::{Document, Value};

/// A single-collection structured query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    from: Vec<CollectionSelector>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    order_by: Vec<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionSelector {
    collection_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Order {
    field: FieldReference,
    direction: Direction,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldReference {
    field_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Ascending,
    Descending,
}

impl StructuredQuery {
    /// Query the direct child collection `collection_id` of the parent.
    pub fn collection(collection_id: &str) -> Self {
        Self {
            from: vec![CollectionSelector {
                collection_id: collection_id.to_string(),
            }],
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn order_by(mut self, field_path: &str, direction: Direction) -> Self {
        self.order_by.push(Order {
            field: FieldReference {
                field_path: field_path.to_string(),
            },
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunQueryRequest<'a> {
    pub structured_query: &'a StructuredQuery,
}

/// One element of the `:runQuery` response stream.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunQueryResponse {
    #[serde(default)]
    pub document: Option<Document>,
}

/// A document write, optionally followed by server-side field transforms.
///
/// An `update` without an update mask replaces the whole document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Write {
    pub update: Document,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub update_transforms: Vec<FieldTransform>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTransform {
    pub field_path: String,
    pub set_to_server_value: ServerValue,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerValue {
    RequestTime,
}

impl FieldTransform {
    /// Set `field_path` to the commit time.
    pub fn request_time(field_path: &str) -> Self {
        Self {
            field_path: field_path.to_string(),
            set_to_server_value: ServerValue::RequestTime,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct CommitRequest<'a> {
    pub writes: &'a [Write],
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    #[serde(default)]
    pub write_results: Vec<WriteResult>,
    #[serde(default)]
    pub commit_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    #[serde(default)]
    pub update_time: Option<String>,
    #[serde(default)]
    pub transform_results: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_query_wire_shape() {
        let query = StructuredQuery::collection("messages")
            .order_by("timestamp", Direction::Descending)
            .limit(20);
        assert_eq!(
            serde_json::to_value(RunQueryRequest {
                structured_query: &query
            })
            .unwrap(),
            json!({"structuredQuery": {
                "from": [{"collectionId": "messages"}],
                "orderBy": [{"field": {"fieldPath": "timestamp"}, "direction": "DESCENDING"}],
                "limit": 20
            }})
        );
    }

    #[test]
    fn test_write_with_request_time_transform() {
        let write = Write {
            update: Document {
                name: "projects/p/databases/(default)/documents/users/u/sessions/s".to_string(),
                ..Document::default()
            },
            update_transforms: vec![FieldTransform::request_time("created_at")],
        };
        let body = serde_json::to_value(&write).unwrap();
        assert_eq!(
            body["updateTransforms"],
            json!([{"fieldPath": "created_at", "setToServerValue": "REQUEST_TIME"}])
        );
    }
}
