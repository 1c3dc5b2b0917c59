pub mod api;
pub mod config;
pub mod core_state; // Shared state handed to HTTP handlers
pub mod db;
pub mod models;
pub mod pipeline;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// Initialize tracing. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Load configuration, open storage and serve the API until Ctrl-C.
///
/// State is built before the async runtime starts: the model clients use
/// blocking HTTP and must not be created inside it.
pub fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::TriageConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        db_path = %config.db_path.display(),
        provider = config.provider.as_str(),
        model = %config.model,
        max_attempts = config.max_attempts,
        "Configuration loaded"
    );

    let core = Arc::new(core_state::CoreState::from_config(config).context("startup failed")?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime
        .block_on(api::serve(core.clone()))
        .context("API server failed")?;
    Ok(())
}
