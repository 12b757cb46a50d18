//! Shared domain types for CodeSensei.
//!
//! Chat sessions and messages, authenticated identities, persona modes,
//! model-facing conversation turns, configuration, and the error types
//! shared by every layer.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod identity;
pub mod llm;
pub mod mode;
