//! Bearer-token authentication extractor.
//!
//! Reads `Authorization: Bearer <id token>` and verifies it with the
//! configured token verifier. Every request is verified afresh.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use codesensei_core::auth::verifier::{TokenVerifier, parse_bearer};
use codesensei_types::identity::UserIdentity;

use crate::http::error::AppError;
use crate::state::AppState;

/// Verified caller. Extracting this rejects the request with 401 otherwise.
pub struct AuthUser(pub UserIdentity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token = parse_bearer(header)?;
        let identity = state.verifier.verify(token).await?;
        Ok(AuthUser(identity))
    }
}
