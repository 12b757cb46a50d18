//! Observability for CodeSensei: subscriber setup and the attribute names
//! used on model-call spans.

pub mod genai_attrs;
pub mod tracing_setup;
