//! Firestore chat repository implementation.
//!
//! Layout:
//! ```text
//! users/{uid}/sessions/{session_id}                      { name, created_at }
//! users/{uid}/sessions/{session_id}/messages/{auto_id}   { role, content, timestamp }
//! ```
//! `created_at` and `timestamp` are set by the server at commit time.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use codesensei_core::chat::repository::ChatRepository;
use codesensei_types::chat::{ChatMessage, ChatSession, MessageRole};
use codesensei_types::error::RepositoryError;

use super::client::FirestoreClient;
use super::query::{CommitResponse, Direction, FieldTransform, StructuredQuery, Write};
use super::value::{Document, Value};

/// Firestore-backed implementation of `ChatRepository`.
pub struct FirestoreChatRepository {
    client: FirestoreClient,
}

impl FirestoreChatRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    fn user_path(uid: &str) -> String {
        format!("users/{uid}")
    }

    fn session_path(uid: &str, session_id: &str) -> String {
        format!("users/{uid}/sessions/{session_id}")
    }

    /// Write `fields` to `path` and stamp `time_field` with the commit time.
    async fn write_stamped(
        &self,
        path: &str,
        fields: Vec<(&str, Value)>,
        time_field: &str,
    ) -> Result<DateTime<Utc>, RepositoryError> {
        let mut update = Document {
            name: self.client.document_name(path),
            ..Document::default()
        };
        for (key, value) in fields {
            update.fields.insert(key.to_string(), value);
        }

        let write = Write {
            update,
            update_transforms: vec![FieldTransform::request_time(time_field)],
        };
        let response = self.client.commit(std::slice::from_ref(&write)).await?;
        Ok(server_time(&response))
    }
}

/// The server-assigned timestamp of a single-write commit.
fn server_time(response: &CommitResponse) -> DateTime<Utc> {
    response
        .write_results
        .first()
        .and_then(|result| result.transform_results.first())
        .and_then(Value::as_timestamp)
        .or_else(|| {
            response
                .commit_time
                .as_deref()
                .and_then(super::value::parse_timestamp)
        })
        .unwrap_or_else(Utc::now)
}

fn session_from_document(doc: &Document) -> ChatSession {
    let id = doc.id().to_string();
    let name = doc
        .get_str("name")
        .map(str::to_string)
        .unwrap_or_else(|| ChatSession::fallback_name(&id));
    let created_at = doc
        .get_timestamp("created_at")
        .or_else(|| doc.created())
        .unwrap_or_default();

    ChatSession {
        id,
        name,
        created_at,
    }
}

fn message_from_document(doc: &Document) -> Result<ChatMessage, RepositoryError> {
    let role: MessageRole = doc
        .get_str("role")
        .ok_or_else(|| RepositoryError::Query(format!("message {} has no role", doc.id())))?
        .parse()
        .map_err(RepositoryError::Query)?;
    let timestamp = doc
        .get_timestamp("timestamp")
        .or_else(|| doc.created())
        .unwrap_or_default();

    Ok(ChatMessage {
        role,
        content: doc.get_str("content").unwrap_or_default().to_string(),
        timestamp,
    })
}

impl ChatRepository for FirestoreChatRepository {
    async fn list_sessions(&self, uid: &str) -> Result<Vec<ChatSession>, RepositoryError> {
        let query =
            StructuredQuery::collection("sessions").order_by("created_at", Direction::Descending);
        let docs = self
            .client
            .run_query(&Self::user_path(uid), &query)
            .await?;

        Ok(docs.iter().map(session_from_document).collect())
    }

    async fn create_session(
        &self,
        uid: &str,
        key: Option<&str>,
        name: &str,
    ) -> Result<ChatSession, RepositoryError> {
        let id = match key {
            Some(key) => key.to_string(),
            None => Uuid::now_v7().simple().to_string(),
        };

        let created_at = self
            .write_stamped(
                &Self::session_path(uid, &id),
                vec![("name", Value::string(name))],
                "created_at",
            )
            .await?;

        Ok(ChatSession {
            id,
            name: name.to_string(),
            created_at,
        })
    }

    async fn delete_session(&self, uid: &str, session_id: &str) -> Result<(), RepositoryError> {
        self.client
            .delete(&Self::session_path(uid, session_id))
            .await
    }

    async fn append_message(
        &self,
        uid: &str,
        session_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatMessage, RepositoryError> {
        let path = format!(
            "{}/messages/{}",
            Self::session_path(uid, session_id),
            Uuid::now_v7().simple()
        );

        let timestamp = self
            .write_stamped(
                &path,
                vec![
                    ("role", Value::string(role.to_string())),
                    ("content", Value::string(content)),
                ],
                "timestamp",
            )
            .await?;

        Ok(ChatMessage {
            role,
            content: content.to_string(),
            timestamp,
        })
    }

    async fn get_messages(
        &self,
        uid: &str,
        session_id: &str,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let query =
            StructuredQuery::collection("messages").order_by("timestamp", Direction::Ascending);
        let docs = self
            .client
            .run_query(&Self::session_path(uid, session_id), &query)
            .await?;

        docs.iter().map(message_from_document).collect()
    }

    async fn recent_messages(
        &self,
        uid: &str,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let query = StructuredQuery::collection("messages")
            .order_by("timestamp", Direction::Descending)
            .limit(limit);
        let docs = self
            .client
            .run_query(&Self::session_path(uid, session_id), &query)
            .await?;

        docs.iter().map(message_from_document).collect()
    }
}
