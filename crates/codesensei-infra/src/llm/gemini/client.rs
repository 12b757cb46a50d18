//! GeminiProvider -- concrete [`LlmProvider`] for the Generative Language API.
//!
//! The API key is held as a [`SecretString`] and sent in the
//! `x-goog-api-key` header, so it never appears in request URLs or logs.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use codesensei_core::llm::provider::LlmProvider;
use codesensei_observe::genai_attrs::{
    GEN_AI_RESPONSE_FINISH_REASONS, GEN_AI_RESPONSE_MODEL, GEN_AI_USAGE_INPUT_TOKENS,
    GEN_AI_USAGE_OUTPUT_TOKENS, PROVIDER_GEMINI,
};
use codesensei_types::config::GeminiConfig;
use codesensei_types::llm::{GenerateRequest, GenerateResponse, LlmError};

use super::types::{GeminiRequest, extract_reply_text, finish_reason, usage};

/// Google Gemini provider.
///
/// Does NOT derive Debug so the key cannot leak through formatting.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: Url,
    api_version: String,
}

impl GeminiProvider {
    /// Build a provider from configuration.
    pub fn new(api_key: SecretString, config: &GeminiConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: parse_base_url(&config.base_url)?,
            api_version: config.api_version.trim_matches('/').to_string(),
        })
    }

    /// Override the base URL (used by tests and proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, LlmError> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    fn endpoint(&self, model: &str) -> Result<Url, LlmError> {
        let path = format!("{}/models/{model}:generateContent", self.api_version);
        self.base_url
            .join(&path)
            .map_err(|e| LlmError::InvalidRequest(format!("bad endpoint for model {model}: {e}")))
    }
}

/// Parse a base URL, forcing a trailing slash so `join` appends.
fn parse_base_url(raw: &str) -> Result<Url, LlmError> {
    let normalized = format!("{}/", raw.trim_end_matches('/'));
    Url::parse(&normalized).map_err(|e| LlmError::InvalidRequest(format!("bad base url: {e}")))
}

fn map_http_error(status: StatusCode, body: String) -> LlmError {
    match status.as_u16() {
        400 => LlmError::InvalidRequest(body),
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited,
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_GEMINI
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let url = self.endpoint(&request.model)?;
        let body = GeminiRequest::from_turns(&request.turns);

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, error_body));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        let text = extract_reply_text(&payload)?;
        let reply = GenerateResponse {
            text,
            model: payload
                .get("modelVersion")
                .and_then(Value::as_str)
                .unwrap_or(&request.model)
                .to_string(),
            finish_reason: finish_reason(&payload),
            usage: usage(&payload),
        };

        let span = tracing::Span::current();
        span.record(GEN_AI_RESPONSE_MODEL, reply.model.as_str());
        span.record(GEN_AI_USAGE_INPUT_TOKENS, reply.usage.input_tokens);
        span.record(GEN_AI_USAGE_OUTPUT_TOKENS, reply.usage.output_tokens);
        if let Some(reason) = reply.finish_reason.as_deref() {
            span.record(GEN_AI_RESPONSE_FINISH_REASONS, reason);
        }

        Ok(reply)
    }
}
