//! Application error type mapping to HTTP status codes and JSON bodies.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use codesensei_core::chat::service::ChatError;
use codesensei_types::error::AuthError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Missing or rejected bearer token. The detail is logged, never returned.
    Unauthorized(String),
    /// Malformed request.
    Validation(String),
    /// Failure in a session route.
    Internal(String),
    /// Failure during a chat round trip.
    Chat(String),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Unauthorized(e.to_string())
    }
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Unauthorized(detail) => {
                tracing::warn!(%detail, "Rejected unauthenticated request");
                (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" }))
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
            AppError::Chat(msg) => {
                tracing::error!(error = %msg, "Chat request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An error occurred.", "details": msg }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
