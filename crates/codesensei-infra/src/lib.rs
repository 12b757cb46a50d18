//! Infrastructure layer for CodeSensei.
//!
//! Contains implementations of the port traits defined in `codesensei-core`:
//! Firestore and SQLite session stores, the Firebase ID-token verifier, the
//! Gemini model client, and the configuration loader.

pub mod config;
pub mod firebase;
pub mod firestore;
pub mod llm;
pub mod sqlite;
