//! Conversation assembly for the model.
//!
//! Layout:
//! ```text
//! user:  <creator note> <persona instruction for mode>
//! model: Understood. I will act as CodeSensei and guide the user.
//! ...    last N stored messages, oldest first (assistant -> model)
//! ```

use codesensei_types::chat::ChatMessage;
use codesensei_types::llm::Turn;
use codesensei_types::mode::ChatMode;

use super::instructions::{ACKNOWLEDGEMENT, system_instruction};

/// Default number of stored messages replayed to the model.
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// Builds the turn sequence for one chat request.
pub struct PromptAssembler;

impl PromptAssembler {
    /// Assemble turns from history fetched newest-first.
    ///
    /// `recent_newest_first` is expected to already be limited by the store;
    /// it is reversed here into chronological order.
    pub fn assemble(mode: ChatMode, recent_newest_first: &[ChatMessage]) -> Vec<Turn> {
        let mut turns = Vec::with_capacity(recent_newest_first.len() + 2);
        turns.push(Turn::user(system_instruction(mode)));
        turns.push(Turn::model(ACKNOWLEDGEMENT));
        turns.extend(recent_newest_first.iter().rev().map(Turn::from));
        turns
    }
}
