//! Session HTTP handlers.
//!
//! Endpoints:
//! - GET    /api/get_chat_sessions            - List the caller's sessions
//! - POST   /api/create_session               - Create (or overwrite) a session
//! - GET    /api/get_session_messages/{id}    - Messages of a session, oldest first
//! - DELETE /api/delete_session/{id}          - Delete a session document

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use codesensei_types::chat::ChatMessage;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub name: String,
}

/// Body of `POST /api/create_session`. The whole body is optional.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub session_name: Option<String>,
}

impl CreateSessionRequest {
    /// Parse leniently: an empty, non-JSON or mistyped body means "no name".
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedSession {
    pub session_id: String,
    pub name: String,
}

/// GET /api/get_chat_sessions - Newest first.
pub async fn list_sessions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<SessionSummary>>, AppError> {
    let sessions = state.chat_service.list_sessions(&user.uid).await?;
    Ok(Json(
        sessions
            .into_iter()
            .map(|s| SessionSummary {
                id: s.id,
                name: s.name,
            })
            .collect(),
    ))
}

/// POST /api/create_session - A non-empty `session_name` is also the id.
pub async fn create_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Bytes,
) -> Result<Json<CreatedSession>, AppError> {
    let request = CreateSessionRequest::from_body(&body);
    let session = state
        .chat_service
        .create_session(&user.uid, request.session_name.as_deref())
        .await?;
    Ok(Json(CreatedSession {
        session_id: session.id,
        name: session.name,
    }))
}

/// GET /api/get_session_messages/{id} - Oldest first.
pub async fn get_session_messages(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    let messages = state
        .chat_service
        .get_messages(&user.uid, &session_id)
        .await?;
    Ok(Json(messages))
}

/// DELETE /api/delete_session/{id} - Messages under the session are kept.
pub async fn delete_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .chat_service
        .delete_session(&user.uid, &session_id)
        .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
