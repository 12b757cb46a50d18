//! HTTP/REST API layer for CodeSensei.
//!
//! Axum-based JSON API under `/api/` with Firebase bearer-token
//! authentication and CORS for the browser frontend.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
