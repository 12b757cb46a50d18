//! Persona modes selecting the system instruction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named persona preset.
///
/// Parsing is lenient: anything that is not a known mode name selects
/// [`ChatMode::General`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    CodingCoach,
    DebuggingAssistant,
    #[default]
    General,
}

impl ChatMode {
    pub const ALL: [ChatMode; 3] = [
        ChatMode::CodingCoach,
        ChatMode::DebuggingAssistant,
        ChatMode::General,
    ];

    /// Resolve a mode name, falling back to `General` for unknown or absent names.
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("coding_coach") => ChatMode::CodingCoach,
            Some("debugging_assistant") => ChatMode::DebuggingAssistant,
            _ => ChatMode::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::CodingCoach => "coding_coach",
            ChatMode::DebuggingAssistant => "debugging_assistant",
            ChatMode::General => "general",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
