//! Prompt assembly: persona instructions plus recent conversation history.

pub mod assembler;
pub mod instructions;
