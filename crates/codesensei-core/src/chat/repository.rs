//! ChatRepository trait definition.
//!
//! Every operation is scoped by the caller's uid: sessions live under
//! `users/{uid}/sessions/{id}` and messages under the session, so one user
//! can never address another user's data.

use codesensei_types::chat::{ChatMessage, ChatSession, MessageRole};
use codesensei_types::error::RepositoryError;

/// Repository trait for chat session and message persistence.
///
/// Implementations live in codesensei-infra (`FirestoreChatRepository`,
/// `SqliteChatRepository`). Uses native async fn in traits (RPITIT).
pub trait ChatRepository: Send + Sync {
    /// List a user's sessions, newest first by creation time.
    fn list_sessions(
        &self,
        uid: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ChatSession>, RepositoryError>> + Send;

    /// Create (or overwrite) a session document.
    ///
    /// When `key` is `Some`, it is used verbatim as the session id and an
    /// existing session with the same id is replaced. When `None`, the store
    /// generates a fresh id.
    fn create_session(
        &self,
        uid: &str,
        key: Option<&str>,
        name: &str,
    ) -> impl std::future::Future<Output = Result<ChatSession, RepositoryError>> + Send;

    /// Delete the session document only. Its messages are left in place.
    fn delete_session(
        &self,
        uid: &str,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Append a message stamped with the store's current time.
    fn append_message(
        &self,
        uid: &str,
        session_id: &str,
        role: MessageRole,
        content: &str,
    ) -> impl std::future::Future<Output = Result<ChatMessage, RepositoryError>> + Send;

    /// All messages of a session, oldest first.
    fn get_messages(
        &self,
        uid: &str,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// At most `limit` messages of a session, newest first.
    fn recent_messages(
        &self,
        uid: &str,
        session_id: &str,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;
}
