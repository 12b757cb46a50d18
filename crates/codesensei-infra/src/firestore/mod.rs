//! Cloud Firestore storage layer.
//!
//! Talks to the Firestore REST API (v1) directly with reqwest. Documents
//! live at `users/{uid}/sessions/{session_id}` and
//! `users/{uid}/sessions/{session_id}/messages/{message_id}`; server
//! timestamps are assigned with `REQUEST_TIME` field transforms.

pub mod chat;
pub mod client;
pub mod credentials;
pub mod query;
pub mod value;

pub use chat::FirestoreChatRepository;
pub use client::FirestoreClient;
