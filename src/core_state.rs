//! Shared application state handed to every HTTP handler.
//!
//! Built once at startup from `TriageConfig`. Holds the store and the
//! orchestrator; nothing here reads configuration after construction.

use std::sync::Arc;

use chrono::Utc;

use crate::config::{ConfigError, LlmProvider, TriageConfig};
use crate::db::DatabaseError;
use crate::models::AuditEntry;
use crate::pipeline::triage::{
    GeminiClient, LlmClient, ModelInvoker, OllamaClient, RetryPolicy, SqliteTriageStore,
    TriageError, TriageOrchestrator,
};

pub struct CoreState {
    pub config: TriageConfig,
    pub store: Arc<SqliteTriageStore>,
    pub orchestrator: Arc<TriageOrchestrator>,
}

impl CoreState {
    /// Open the database and build the configured model client.
    pub fn from_config(config: TriageConfig) -> Result<Self, CoreError> {
        let store = Arc::new(SqliteTriageStore::open(
            &config.db_path,
            config.db_busy_timeout,
        )?);
        let llm = build_llm_client(&config)?;
        Ok(Self::with_parts(config, store, llm))
    }

    pub fn with_parts(
        config: TriageConfig,
        store: Arc<SqliteTriageStore>,
        llm: Arc<dyn LlmClient + Send + Sync>,
    ) -> Self {
        let policy = RetryPolicy {
            max_attempts: config.max_attempts,
            retry_delay: config.retry_delay,
        };
        let orchestrator = Arc::new(TriageOrchestrator::new(
            ModelInvoker::new(llm, policy),
            store.clone(),
        ));
        Self {
            config,
            store,
            orchestrator,
        }
    }

    /// Label of the active model, e.g. `ollama:medgemma:4b`.
    pub fn model_label(&self) -> String {
        self.orchestrator.invoker().describe_model()
    }

    /// Append an audit entry. Failures are logged and swallowed.
    pub fn log_audit(
        &self,
        user_id: &str,
        action: &str,
        details: Option<String>,
        ip_address: Option<String>,
    ) {
        let entry = AuditEntry {
            user_id: Some(user_id.to_string()),
            action: action.to_string(),
            details,
            ip_address,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.store.record_audit(&entry) {
            tracing::error!(action, error = %e, "Failed to write audit entry");
        }
    }
}

fn build_llm_client(config: &TriageConfig) -> Result<Arc<dyn LlmClient + Send + Sync>, CoreError> {
    let client: Arc<dyn LlmClient + Send + Sync> = match config.provider {
        LlmProvider::Ollama => Arc::new(OllamaClient::new(
            &config.llm_base_url,
            &config.model,
            config.llm_timeout_secs,
        )?),
        LlmProvider::Gemini => {
            let key = config
                .gemini_api_key
                .as_deref()
                .ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;
            Arc::new(GeminiClient::new(
                &config.llm_base_url,
                &config.model,
                key,
                config.llm_timeout_secs,
            )?)
        }
    };
    Ok(client)
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Model client error: {0}")]
    ModelClient(#[from] TriageError),
}
