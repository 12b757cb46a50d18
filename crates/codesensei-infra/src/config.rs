//! Configuration loader for CodeSensei.
//!
//! Reads `config.toml` (from `--config` or the data directory) into
//! [`SenseiConfig`], falling back to defaults when the file is missing or
//! malformed, then layers environment overrides on top.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use codesensei_types::config::{SenseiConfig, StoreBackend};

/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Resolve the data directory.
///
/// `CODESENSEI_DATA_DIR` wins; otherwise `~/.codesensei`.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = process_env("CODESENSEI_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".codesensei")
}

/// Default location of the config file inside `data_dir`.
pub fn default_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Load configuration from `config_path`.
///
/// - Missing file: returns [`SenseiConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
pub async fn load_config(config_path: &Path) -> SenseiConfig {
    let content = match tokio::fs::read_to_string(config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", config_path.display());
            return SenseiConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return SenseiConfig::default();
        }
    };

    match toml::from_str::<SenseiConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            SenseiConfig::default()
        }
    }
}

/// Apply environment overrides on top of file configuration.
///
/// `env` is a lookup function so tests need not touch the process
/// environment; pass [`process_env`] in production.
pub fn apply_env_overrides(config: &mut SenseiConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(model) = env("GEMINI_MODEL") {
        config.gemini.model = model;
    }
    if let Some(project) = env("FIREBASE_PROJECT_ID") {
        config.firebase.project_id = Some(project);
    }
    if let Some(path) = env("GOOGLE_APPLICATION_CREDENTIALS") {
        config.store.credentials_path = Some(path);
    }
    if let Some(host) = env("FIRESTORE_EMULATOR_HOST") {
        config.store.emulator_host = Some(host);
    }
    if let Some(backend) = env("CODESENSEI_STORE") {
        match backend.parse::<StoreBackend>() {
            Ok(backend) => config.store.backend = backend,
            Err(err) => tracing::warn!("Ignoring CODESENSEI_STORE: {err}"),
        }
    }
    if let Some(origins) = env("CODESENSEI_ALLOWED_ORIGINS") {
        config.server.allowed_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
    }
}

/// The Gemini API key, if set.
pub fn gemini_api_key(env: impl Fn(&str) -> Option<String>) -> Option<SecretString> {
    env(GEMINI_API_KEY_ENV).map(SecretString::from)
}

/// Read a non-empty environment variable.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// SQLite database file: the configured path or `<data dir>/codesensei.db`.
pub fn sqlite_path(config: &SenseiConfig, data_dir: &Path) -> PathBuf {
    config
        .store
        .sqlite_path
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join("codesensei.db"))
}
