//! Authenticated caller identity.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity decoded from a verified bearer token.
///
/// `uid` is the identity provider's opaque user id and partitions all
/// stored data. Nothing about the user is persisted locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Remaining token claims, as issued.
    #[serde(default)]
    pub claims: Map<String, Value>,
}

impl UserIdentity {
    /// Identity carrying only a uid.
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            claims: Map::new(),
        }
    }
}
