//! Gemini `generateContent` wire types.
//!
//! Only the request side is typed. Replies are read from a raw
//! `serde_json::Value`; the reply may be a plain string, an object with
//! `text`, or candidate parts.

use serde::Serialize;
use serde_json::Value;

use codesensei_types::llm::{LlmError, Turn, Usage};

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeminiContent {
    pub role: String,
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeminiPart {
    pub text: String,
}

impl From<&Turn> for GeminiContent {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.to_string(),
            parts: vec![GeminiPart {
                text: turn.text.clone(),
            }],
        }
    }
}

impl GeminiRequest {
    pub fn from_turns(turns: &[Turn]) -> Self {
        Self {
            contents: turns.iter().map(GeminiContent::from).collect(),
        }
    }
}

/// Pull the reply text out of a response payload.
///
/// Accepted shapes, first match wins:
/// 1. a bare JSON string
/// 2. an object with a string `text` field
/// 3. the first candidate's `content`, either a string or an object whose
///    `parts[].text` values are concatenated
pub fn extract_reply_text(payload: &Value) -> Result<String, LlmError> {
    if let Some(text) = payload.as_str() {
        return Ok(text.to_string());
    }
    if let Some(text) = payload.get("text").and_then(Value::as_str) {
        return Ok(text.to_string());
    }

    let content = payload
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"));

    let text = match content {
        Some(Value::String(text)) => Some(text.clone()),
        Some(content) => content
            .get("parts")
            .and_then(Value::as_array)
            .and_then(|parts| {
                let texts: Vec<&str> = parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect();
                if texts.is_empty() {
                    None
                } else {
                    Some(texts.concat())
                }
            }),
        None => None,
    };

    text.ok_or_else(|| LlmError::EmptyReply {
        block_reason: payload
            .get("promptFeedback")
            .and_then(|feedback| feedback.get("blockReason"))
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Finish reason of the first candidate, if reported.
pub fn finish_reason(payload: &Value) -> Option<String> {
    payload
        .get("candidates")?
        .as_array()?
        .first()?
        .get("finishReason")?
        .as_str()
        .map(str::to_string)
}

/// Token counts from `usageMetadata`; zero when absent.
pub fn usage(payload: &Value) -> Usage {
    let count = |field: &str| {
        payload
            .get("usageMetadata")
            .and_then(|usage| usage.get(field))
            .and_then(Value::as_u64)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(0)
    };
    Usage {
        input_tokens: count("promptTokenCount"),
        output_tokens: count("candidatesTokenCount"),
    }
}
