use thiserror::Error;

/// Errors from store operations (used by trait definitions in codesensei-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store credentials error: {0}")]
    Credentials(String),
}

/// Errors from bearer-token verification.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("signing keys unavailable: {0}")]
    KeySource(String),
}
