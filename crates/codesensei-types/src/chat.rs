//! Chat session and message types for CodeSensei.
//!
//! A user owns many sessions; a session owns an append-only list of
//! timestamped messages. Sessions are keyed by a string document id, which
//! is the caller-supplied name when one was given at creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Who authored a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A named conversation thread owned by one user.
///
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    /// Label used when a stored session carries no name.
    pub fn fallback_name(id: &str) -> String {
        let prefix: String = id.chars().take(5).collect();
        format!("Session {prefix}")
    }

    /// Label given to sessions created without an explicit name.
    pub fn default_name(now: DateTime<Utc>) -> String {
        format!("Chat - {}", now.format("%Y-%m-%d %H:%M"))
    }
}

/// A single message within a chat session.
///
/// Messages are ordered by `timestamp`, which the store assigns at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
