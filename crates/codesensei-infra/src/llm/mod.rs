//! Generative model provider implementations.

pub mod gemini;
