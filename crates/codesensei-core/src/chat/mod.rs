//! Chat session and message persistence plus the chat orchestration service.
//!
//! `ChatRepository` is the port the store adapters implement;
//! `ChatService` wires it to the prompt assembler and a model provider.

pub mod box_repository;
pub mod repository;
pub mod service;
