//! BoxChatRepository -- object-safe dynamic dispatch wrapper for ChatRepository.
//!
//! Same blanket-impl pattern as `BoxLlmProvider`:
//! 1. Define an object-safe `ChatRepositoryDyn` trait with boxed futures
//! 2. Blanket-impl `ChatRepositoryDyn` for all `T: ChatRepository`
//! 3. `BoxChatRepository` wraps `Box<dyn ChatRepositoryDyn>` and itself
//!    implements `ChatRepository`, so services stay generic.

use std::future::Future;
use std::pin::Pin;

use codesensei_types::chat::{ChatMessage, ChatSession, MessageRole};
use codesensei_types::error::RepositoryError;

use super::repository::ChatRepository;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe version of [`ChatRepository`] with boxed futures.
pub trait ChatRepositoryDyn: Send + Sync {
    fn list_sessions_boxed<'a>(
        &'a self,
        uid: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ChatSession>, RepositoryError>>;

    fn create_session_boxed<'a>(
        &'a self,
        uid: &'a str,
        key: Option<&'a str>,
        name: &'a str,
    ) -> BoxFuture<'a, Result<ChatSession, RepositoryError>>;

    fn delete_session_boxed<'a>(
        &'a self,
        uid: &'a str,
        session_id: &'a str,
    ) -> BoxFuture<'a, Result<(), RepositoryError>>;

    fn append_message_boxed<'a>(
        &'a self,
        uid: &'a str,
        session_id: &'a str,
        role: MessageRole,
        content: &'a str,
    ) -> BoxFuture<'a, Result<ChatMessage, RepositoryError>>;

    fn get_messages_boxed<'a>(
        &'a self,
        uid: &'a str,
        session_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ChatMessage>, RepositoryError>>;

    fn recent_messages_boxed<'a>(
        &'a self,
        uid: &'a str,
        session_id: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<ChatMessage>, RepositoryError>>;
}

impl<T: ChatRepository> ChatRepositoryDyn for T {
    fn list_sessions_boxed<'a>(
        &'a self,
        uid: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ChatSession>, RepositoryError>> {
        Box::pin(self.list_sessions(uid))
    }

    fn create_session_boxed<'a>(
        &'a self,
        uid: &'a str,
        key: Option<&'a str>,
        name: &'a str,
    ) -> BoxFuture<'a, Result<ChatSession, RepositoryError>> {
        Box::pin(self.create_session(uid, key, name))
    }

    fn delete_session_boxed<'a>(
        &'a self,
        uid: &'a str,
        session_id: &'a str,
    ) -> BoxFuture<'a, Result<(), RepositoryError>> {
        Box::pin(self.delete_session(uid, session_id))
    }

    fn append_message_boxed<'a>(
        &'a self,
        uid: &'a str,
        session_id: &'a str,
        role: MessageRole,
        content: &'a str,
    ) -> BoxFuture<'a, Result<ChatMessage, RepositoryError>> {
        Box::pin(self.append_message(uid, session_id, role, content))
    }

    fn get_messages_boxed<'a>(
        &'a self,
        uid: &'a str,
        session_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ChatMessage>, RepositoryError>> {
        Box::pin(self.get_messages(uid, session_id))
    }

    fn recent_messages_boxed<'a>(
        &'a self,
        uid: &'a str,
        session_id: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<ChatMessage>, RepositoryError>> {
        Box::pin(self.recent_messages(uid, session_id, limit))
    }
}

/// Type-erased chat repository for runtime store selection.
///
/// Lets the application pick Firestore or SQLite from configuration while
/// `ChatService` keeps its static generic parameter.
pub struct BoxChatRepository {
    inner: Box<dyn ChatRepositoryDyn>,
}

impl BoxChatRepository {
    /// Wrap a concrete `ChatRepository` in a type-erased box.
    pub fn new<T: ChatRepository + 'static>(repo: T) -> Self {
        Self {
            inner: Box::new(repo),
        }
    }
}

impl ChatRepository for BoxChatRepository {
    async fn list_sessions(&self, uid: &str) -> Result<Vec<ChatSession>, RepositoryError> {
        self.inner.list_sessions_boxed(uid).await
    }

    async fn create_session(
        &self,
        uid: &str,
        key: Option<&str>,
        name: &str,
    ) -> Result<ChatSession, RepositoryError> {
        self.inner.create_session_boxed(uid, key, name).await
    }

    async fn delete_session(&self, uid: &str, session_id: &str) -> Result<(), RepositoryError> {
        self.inner.delete_session_boxed(uid, session_id).await
    }

    async fn append_message(
        &self,
        uid: &str,
        session_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatMessage, RepositoryError> {
        self.inner
            .append_message_boxed(uid, session_id, role, content)
            .await
    }

    async fn get_messages(
        &self,
        uid: &str,
        session_id: &str,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.inner.get_messages_boxed(uid, session_id).await
    }

    async fn recent_messages(
        &self,
        uid: &str,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.inner
            .recent_messages_boxed(uid, session_id, limit)
            .await
    }
}
