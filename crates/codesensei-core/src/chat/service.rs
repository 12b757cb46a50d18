//! Chat service orchestrating session CRUD and the chat round trip.
//!
//! A chat request is: persist the user message, read back the most recent
//! history (which now includes that message), assemble the prompt, call the
//! model once, persist the reply. There is no retry; if the model call fails
//! the user message stays stored and no assistant message is written.

use chrono::Utc;
use tracing::{Instrument, debug, info, info_span};

use codesensei_types::chat::{ChatMessage, ChatSession, MessageRole};
use codesensei_types::error::RepositoryError;
use codesensei_types::llm::{GenerateRequest, LlmError, Usage};
use codesensei_types::mode::ChatMode;

use crate::chat::repository::ChatRepository;
use crate::llm::provider::LlmProvider;
use crate::prompt::assembler::{DEFAULT_HISTORY_LIMIT, PromptAssembler};

/// Failure anywhere in a chat operation.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Result of a completed chat round trip.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    pub usage: Usage,
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
}

/// Orchestrates session persistence and model calls.
///
/// Generic over `ChatRepository` and `LlmProvider` to maintain clean
/// architecture (codesensei-core never depends on codesensei-infra).
pub struct ChatService<C: ChatRepository, L: LlmProvider> {
    chat_repo: C,
    llm: L,
    model: String,
    history_limit: u32,
}

impl<C: ChatRepository, L: LlmProvider> ChatService<C, L> {
    /// Create a new chat service using `model` for every generation.
    pub fn new(chat_repo: C, llm: L, model: String) -> Self {
        Self {
            chat_repo,
            llm,
            model,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Override how many stored messages are replayed to the model.
    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit;
        self
    }

    /// Access the chat repository.
    pub fn chat_repo(&self) -> &C {
        &self.chat_repo
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    // --- Sessions ---

    /// List a user's sessions, newest first.
    pub async fn list_sessions(&self, uid: &str) -> Result<Vec<ChatSession>, ChatError> {
        Ok(self.chat_repo.list_sessions(uid).await?)
    }

    /// Create a session.
    ///
    /// A non-empty `name` doubles as the session key; without one the store
    /// picks the key and the session is labelled with the current UTC time.
    pub async fn create_session(
        &self,
        uid: &str,
        name: Option<&str>,
    ) -> Result<ChatSession, ChatError> {
        let name = name.filter(|n| !n.is_empty());
        let label = match name {
            Some(name) => name.to_string(),
            None => ChatSession::default_name(Utc::now()),
        };

        let session = self.chat_repo.create_session(uid, name, &label).await?;
        info!(uid = %uid, session_id = %session.id, "Session created");
        Ok(session)
    }

    /// Delete a session document. Messages under it are not removed.
    pub async fn delete_session(&self, uid: &str, session_id: &str) -> Result<(), ChatError> {
        self.chat_repo.delete_session(uid, session_id).await?;
        info!(uid = %uid, session_id = %session_id, "Session deleted");
        Ok(())
    }

    /// All messages of a session, oldest first.
    pub async fn get_messages(
        &self,
        uid: &str,
        session_id: &str,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        Ok(self.chat_repo.get_messages(uid, session_id).await?)
    }

    // --- Chat ---

    /// Run one chat round trip and return the model's reply.
    pub async fn send_message(
        &self,
        uid: &str,
        session_id: &str,
        mode: ChatMode,
        text: &str,
    ) -> Result<ChatReply, ChatError> {
        let user_message = self
            .chat_repo
            .append_message(uid, session_id, MessageRole::User, text)
            .await?;

        let recent = self
            .chat_repo
            .recent_messages(uid, session_id, self.history_limit)
            .await?;
        debug!(session_id = %session_id, history = recent.len(), mode = %mode, "Assembling prompt");

        let request = GenerateRequest {
            model: self.model.clone(),
            turns: PromptAssembler::assemble(mode, &recent),
        };

        let span = info_span!(
            "gen_ai.generate",
            gen_ai.system = self.llm.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.turns = request.turns.len(),
            gen_ai.response.model = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
        );
        let response = self.llm.generate(&request).instrument(span).await?;

        let assistant_message = self
            .chat_repo
            .append_message(uid, session_id, MessageRole::Assistant, &response.text)
            .await?;

        info!(
            uid = %uid,
            session_id = %session_id,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Chat reply stored"
        );

        Ok(ChatReply {
            text: response.text,
            usage: response.usage,
            user_message,
            assistant_message,
        })
    }
}
