//! Configuration types for CodeSensei.
//!
//! `SenseiConfig` mirrors `config.toml`. Every field has a default so an
//! empty or missing file yields a runnable configuration (apart from the
//! secrets, which only ever come from the environment).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenseiConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub firebase: FirebaseConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

/// HTTP listener and CORS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Browser origins allowed to call the API with credentials.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Generative model settings. The API key is read from `GEMINI_API_KEY`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/".to_string()
}

fn default_api_version() -> String {
    "v1beta".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_gemini_base_url(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Identity provider settings for ID-token verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseConfig {
    /// Firebase project id; used as token audience and in the issuer URL.
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_jwks_uri")]
    pub jwks_uri: String,
    #[serde(default = "default_jwks_cache_ttl_secs")]
    pub jwks_cache_ttl_secs: u64,
}

fn default_jwks_uri() -> String {
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com"
        .to_string()
}

fn default_jwks_cache_ttl_secs() -> u64 {
    300
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            jwks_uri: default_jwks_uri(),
            jwks_cache_ttl_secs: default_jwks_cache_ttl_secs(),
        }
    }
}

/// Which store adapter backs the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Firestore,
    Sqlite,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Firestore => write!(f, "firestore"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(format!("invalid store backend: '{other}'")),
        }
    }
}

/// Session store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// SQLite database file; defaults to `<data dir>/codesensei.db`.
    #[serde(default)]
    pub sqlite_path: Option<String>,
    /// Service-account JSON key for Firestore.
    #[serde(default)]
    pub credentials_path: Option<String>,
    /// `host:port` of a Firestore emulator; disables credential exchange.
    #[serde(default)]
    pub emulator_host: Option<String>,
}

/// Conversation assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Number of most recent stored messages replayed to the model.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
}

fn default_history_limit() -> u32 {
    20
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}
