//! Shared application state for the REST API.
//!
//! `AppState` holds the chat service, the token verifier and the resolved
//! configuration behind `Arc`s so handlers can clone it cheaply. Store and
//! model backends are erased to `BoxChatRepository` / `BoxLlmProvider` so the
//! store can be picked from configuration at startup.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use codesensei_core::auth::verifier::BoxTokenVerifier;
use codesensei_core::chat::box_repository::BoxChatRepository;
use codesensei_core::chat::service::ChatService;
use codesensei_core::llm::box_provider::BoxLlmProvider;
use codesensei_infra::config::{gemini_api_key, process_env, sqlite_path};
use codesensei_infra::firebase::{FirebaseTokenVerifier, FirebaseVerifierConfig};
use codesensei_infra::firestore::{FirestoreChatRepository, FirestoreClient};
use codesensei_infra::llm::gemini::GeminiProvider;
use codesensei_infra::sqlite::chat::SqliteChatRepository;
use codesensei_infra::sqlite::pool::{DatabasePool, database_url};
use codesensei_types::config::{SenseiConfig, StoreBackend};

/// Concrete type alias for the chat service used by the API.
pub type ConcreteChatService = ChatService<BoxChatRepository, BoxLlmProvider>;

/// Shared state available to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub verifier: Arc<BoxTokenVerifier>,
    pub config: Arc<SenseiConfig>,
}

impl AppState {
    pub fn new(
        chat_service: ConcreteChatService,
        verifier: BoxTokenVerifier,
        config: SenseiConfig,
    ) -> Self {
        Self {
            chat_service: Arc::new(chat_service),
            verifier: Arc::new(verifier),
            config: Arc::new(config),
        }
    }

    /// Wire every backend from configuration.
    ///
    /// Fails if the model API key is missing, the Firebase project is not
    /// configured, or the selected store cannot be opened.
    pub async fn init(config: SenseiConfig, data_dir: &Path) -> anyhow::Result<Self> {
        let api_key = gemini_api_key(process_env)
            .context("GEMINI_API_KEY is not set; the model client cannot be configured")?;
        let llm = GeminiProvider::new(api_key, &config.gemini)
            .context("failed to build the Gemini client")?;

        let repo = open_store(&config, data_dir).await?;

        let verifier_config = FirebaseVerifierConfig::from_config(&config.firebase)
            .context("token verification needs firebase.project_id (or FIREBASE_PROJECT_ID)")?;
        let verifier = FirebaseTokenVerifier::new(verifier_config)
            .context("failed to build the token verifier")?;

        let chat_service = ChatService::new(
            repo,
            BoxLlmProvider::new(llm),
            config.gemini.model.clone(),
        )
        .with_history_limit(config.chat.history_limit);

        info!(
            store = %config.store.backend,
            model = %config.gemini.model,
            history_limit = config.chat.history_limit,
            "Application state initialized"
        );

        Ok(Self::new(
            chat_service,
            BoxTokenVerifier::new(verifier),
            config,
        ))
    }
}

async fn open_store(config: &SenseiConfig, data_dir: &Path) -> anyhow::Result<BoxChatRepository> {
    match config.store.backend {
        StoreBackend::Firestore => {
            let client = FirestoreClient::from_config(&config.store, &config.firebase)
                .await
                .context("failed to configure the Firestore client")?;
            info!(project = %client.project_id(), "Using Firestore session store");
            Ok(BoxChatRepository::new(FirestoreChatRepository::new(client)))
        }
        StoreBackend::Sqlite => {
            let path = sqlite_path(config, data_dir);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let pool = DatabasePool::new(&database_url(&path))
                .await
                .with_context(|| format!("failed to open SQLite store at {}", path.display()))?;
            info!(path = %path.display(), "Using SQLite session store");
            Ok(BoxChatRepository::new(SqliteChatRepository::new(pool)))
        }
    }
}
