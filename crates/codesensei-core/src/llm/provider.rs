//! LlmProvider trait definition.
//!
//! This is the core abstraction that generative model backends implement.
//! Uses RPITIT for `generate`; see `box_provider` for dynamic dispatch.

use codesensei_types::llm::{GenerateRequest, GenerateResponse, LlmError};

/// Trait for generative model backends (Gemini today).
///
/// Implementations live in codesensei-infra (e.g., `GeminiProvider`).
/// A single blocking-style call per request: no streaming, no retry.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Send the assembled conversation and receive the reply text.
    fn generate(
        &self,
        request: &GenerateRequest,
    ) -> impl std::future::Future<Output = Result<GenerateResponse, LlmError>> + Send;
}
