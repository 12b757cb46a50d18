//! TokenVerifier trait and bearer-header parsing.
//!
//! Every request re-verifies its token; implementations may cache signing
//! key material but never verification results.

use std::future::Future;
use std::pin::Pin;

use codesensei_types::error::AuthError;
use codesensei_types::identity::UserIdentity;

/// Verifies a bearer token against an identity provider.
///
/// Implementations live in codesensei-infra (e.g., `FirebaseTokenVerifier`).
pub trait TokenVerifier: Send + Sync {
    /// Validate `token` and return the identity it carries.
    fn verify(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<UserIdentity, AuthError>> + Send;
}

/// Object-safe version of [`TokenVerifier`].
pub trait TokenVerifierDyn: Send + Sync {
    fn verify_boxed<'a>(
        &'a self,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<UserIdentity, AuthError>> + Send + 'a>>;
}

impl<T: TokenVerifier> TokenVerifierDyn for T {
    fn verify_boxed<'a>(
        &'a self,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<UserIdentity, AuthError>> + Send + 'a>> {
        Box::pin(self.verify(token))
    }
}

/// Type-erased token verifier held in application state.
pub struct BoxTokenVerifier {
    inner: Box<dyn TokenVerifierDyn>,
}

impl BoxTokenVerifier {
    pub fn new<T: TokenVerifier + 'static>(verifier: T) -> Self {
        Self {
            inner: Box::new(verifier),
        }
    }
}

impl TokenVerifier for BoxTokenVerifier {
    async fn verify(&self, token: &str) -> Result<UserIdentity, AuthError> {
        self.inner.verify_boxed(token).await
    }
}

/// Extract the token from an `Authorization` header value.
///
/// Only the `Bearer` scheme is accepted; an empty token is rejected.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or_else(|| {
        AuthError::MissingCredentials("Authorization header not present".to_string())
    })?;
    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        AuthError::MissingCredentials("Authorization header is not a Bearer credential".to_string())
    })?;
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredentials("empty bearer token".to_string()));
    }
    Ok(token)
}
