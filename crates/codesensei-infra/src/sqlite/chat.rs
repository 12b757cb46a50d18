//! SQLite chat repository implementation.
//!
//! Implements `ChatRepository` from `codesensei-core` with raw sqlx queries,
//! private Row structs, and the split reader/writer pool. Timestamps are
//! stored as fixed-width RFC 3339 strings so lexical order is time order;
//! `seq` breaks ties between messages written in the same microsecond.

use chrono::{DateTime, SecondsFormat, Utc};
use codesensei_core::chat::repository::ChatRepository;
use codesensei_types::chat::{ChatMessage, ChatSession, MessageRole};
use codesensei_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ChatRepository`.
pub struct SqliteChatRepository {
    pool: DatabasePool,
}

impl SqliteChatRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ChatSessionRow {
    id: String,
    name: Option<String>,
    created_at: String,
}

impl ChatSessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_session(self) -> Result<ChatSession, RepositoryError> {
        let created_at = parse_datetime(&self.created_at)?;
        let name = self
            .name
            .unwrap_or_else(|| ChatSession::fallback_name(&self.id));

        Ok(ChatSession {
            id: self.id,
            name,
            created_at,
        })
    }
}

struct ChatMessageRow {
    role: String,
    content: String,
    timestamp: String,
}

impl ChatMessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            timestamp: row.try_get("timestamp")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(ChatMessage {
            role,
            content: self.content,
            timestamp: parse_datetime(&self.timestamp)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Round-trip through the stored representation so callers see exactly
/// what a later read returns.
fn stored_now() -> Result<(String, DateTime<Utc>), RepositoryError> {
    let text = format_datetime(&Utc::now());
    let parsed = parse_datetime(&text)?;
    Ok((text, parsed))
}

fn map_messages(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<ChatMessage>, RepositoryError> {
    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        let message_row =
            ChatMessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        messages.push(message_row.into_message()?);
    }
    Ok(messages)
}

// ---------------------------------------------------------------------------
// ChatRepository implementation
// ---------------------------------------------------------------------------

impl ChatRepository for SqliteChatRepository {
    async fn list_sessions(&self, uid: &str) -> Result<Vec<ChatSession>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, created_at FROM chat_sessions WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(uid)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            let session_row =
                ChatSessionRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            sessions.push(session_row.into_session()?);
        }

        Ok(sessions)
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
        let (created_text, created_at) = stored_now()?;

        // Same-key creation replaces the session wholesale.
        sqlx::query(
            r#"INSERT INTO chat_sessions (user_id, id, name, created_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (user_id, id) DO UPDATE SET
                   name = excluded.name,
                   created_at = excluded.created_at"#,
        )
        .bind(uid)
        .bind(&id)
        .bind(name)
        .bind(&created_text)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(ChatSession {
            id,
            name: name.to_string(),
            created_at,
        })
    }

    async fn delete_session(&self, uid: &str, session_id: &str) -> Result<(), RepositoryError> {
        // Deleting an absent session is not an error, matching the document store.
        sqlx::query("DELETE FROM chat_sessions WHERE user_id = ? AND id = ?")
            .bind(uid)
            .bind(session_id)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn append_message(
        &self,
        uid: &str,
        session_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatMessage, RepositoryError> {
        let (timestamp_text, timestamp) = stored_now()?;

        sqlx::query(
            r#"INSERT INTO chat_messages (user_id, session_id, role, content, timestamp)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(uid)
        .bind(session_id)
        .bind(role.to_string())
        .bind(content)
        .bind(&timestamp_text)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

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
        let rows = sqlx::query(
            r#"SELECT role, content, timestamp FROM chat_messages
               WHERE user_id = ? AND session_id = ?
               ORDER BY timestamp ASC, seq ASC"#,
        )
        .bind(uid)
        .bind(session_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        map_messages(&rows)
    }

    async fn recent_messages(
        &self,
        uid: &str,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT role, content, timestamp FROM chat_messages
               WHERE user_id = ? AND session_id = ?
               ORDER BY timestamp DESC, seq DESC
               LIMIT ?"#,
        )
        .bind(uid)
        .bind(session_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        map_messages(&rows)
    }
}
