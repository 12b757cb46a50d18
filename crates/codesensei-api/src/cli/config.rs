//! `codesensei config` -- print the resolved configuration.

use serde_json::Value;

use codesensei_infra::config::{gemini_api_key, process_env};
use codesensei_types::config::SenseiConfig;

/// Render `config` as JSON, reporting whether the API key is set without
/// revealing it.
pub fn render_config(config: &SenseiConfig, api_key_set: bool) -> anyhow::Result<Value> {
    let mut value = serde_json::to_value(config)?;
    value["gemini"]["api_key"] = if api_key_set {
        Value::String("<redacted>".to_string())
    } else {
        Value::Null
    };
    Ok(value)
}

pub fn print_config(config: &SenseiConfig) -> anyhow::Result<()> {
    let api_key_set = gemini_api_key(process_env).is_some();
    let value = render_config(config, api_key_set)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
