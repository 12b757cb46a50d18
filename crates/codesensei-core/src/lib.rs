//! Business logic and port trait definitions for CodeSensei.
//!
//! This crate defines the "ports" (store, model, and token-verifier traits)
//! that the infrastructure layer implements, plus the chat orchestration and
//! prompt assembly built on top of them. It depends only on
//! `codesensei-types` -- never on `codesensei-infra` or any I/O crate.

pub mod auth;
pub mod chat;
pub mod llm;
pub mod prompt;
