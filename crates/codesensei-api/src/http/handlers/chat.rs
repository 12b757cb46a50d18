//! Chat HTTP handler.
//!
//! POST /api/chat - Store the message, ask the model, store and return the reply.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use codesensei_types::mode::ChatMode;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::state::AppState;

const MISSING_FIELDS: &str = "Message and session_id are required";

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Any JSON value; only known mode names select a persona.
    #[serde(default)]
    pub mode: Option<Value>,
}

impl ChatRequest {
    /// Parse the body and check the required fields.
    ///
    /// Returns `(message, session_id, mode)`. A body that does not parse is
    /// treated like one with both fields missing.
    pub fn validate(body: &[u8]) -> Result<(String, String, ChatMode), AppError> {
        let request: ChatRequest = serde_json::from_slice(body).unwrap_or_default();
        let message = request.message.filter(|m| !m.is_empty());
        let session_id = request.session_id.filter(|s| !s.is_empty());
        match (message, session_id) {
            (Some(message), Some(session_id)) => Ok((
                message,
                session_id,
                ChatMode::from_name(request.mode.as_ref().and_then(Value::as_str)),
            )),
            _ => Err(AppError::Validation(MISSING_FIELDS.to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Bytes,
) -> Result<Json<ChatResponse>, AppError> {
    let (message, session_id, mode) = ChatRequest::validate(&body)?;

    let reply = state
        .chat_service
        .send_message(&user.uid, &session_id, mode, &message)
        .await
        .map_err(|e| AppError::Chat(e.to_string()))?;

    Ok(Json(ChatResponse {
        response: reply.text,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_message_and_session() {
        for body in [
            &b""[..],
            br#"{}"#,
            br#"{"message": "hi"}"#,
            br#"{"session_id": "s1"}"#,
            br#"{"message": "", "session_id": "s1"}"#,
            br#"{"message": "hi", "session_id": ""}"#,
        ] {
            match ChatRequest::validate(body) {
                Err(AppError::Validation(msg)) => assert_eq!(msg, MISSING_FIELDS),
                _ => panic!("expected validation error for {:?}", String::from_utf8_lossy(body)),
            }
        }
    }

    #[test]
    fn test_validate_resolves_mode() {
        let (message, session_id, mode) = ChatRequest::validate(
            br#"{"message": "why?", "session_id": "s1", "mode": "debugging_assistant"}"#,
        )
        .unwrap();
        assert_eq!(message, "why?");
        assert_eq!(session_id, "s1");
        assert_eq!(mode, ChatMode::DebuggingAssistant);

        let (_, _, mode) =
            ChatRequest::validate(br#"{"message": "m", "session_id": "s", "mode": "pirate"}"#)
                .unwrap();
        assert_eq!(mode, ChatMode::General);

        for body in [
            &br#"{"message": "hi", "session_id": "s1", "mode": 5}"#[..],
            br#"{"message": "hi", "session_id": "s1", "mode": null}"#,
            br#"{"message": "hi", "session_id": "s1", "mode": {"name": "coding_coach"}}"#,
        ] {
            let (message, _, mode) = ChatRequest::validate(body).unwrap();
            assert_eq!(message, "hi");
            assert_eq!(mode, ChatMode::General);
        }
    }
}
