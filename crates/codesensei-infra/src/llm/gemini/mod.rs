//! Google Gemini provider implementation.
//!
//! Provides [`GeminiProvider`], a non-streaming
//! [`LlmProvider`](codesensei_core::llm::provider::LlmProvider) backed by the
//! `generateContent` endpoint of the Generative Language API.

pub mod client;
pub mod types;

pub use client::GeminiProvider;
