//! OpenTelemetry GenAI semantic-convention attribute names.
//!
//! Model-call spans are opened by the chat service as `gen_ai.generate` with
//! the usage and finish-reason fields declared empty; providers fill them in
//! with `Span::record` using these names.

/// The model version that actually served the request.
pub const GEN_AI_RESPONSE_MODEL: &str = "gen_ai.response.model";

/// The number of input tokens consumed.
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

/// The number of output tokens generated.
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// The finish reason reported for the first candidate (e.g., "STOP").
pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";

/// Provider identifier for Google Gemini.
pub const PROVIDER_GEMINI: &str = "gemini";
