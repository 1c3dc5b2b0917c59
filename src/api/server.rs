//! API server lifecycle.
//!
//! `serve` runs in the foreground until Ctrl-C. `start_server_on` binds,
//! spawns the server in a background task and returns a handle with a
//! shutdown channel.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::api_router;
use crate::core_state::CoreState;

/// Handle to a background API server.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ApiServer {
    /// Signal graceful shutdown. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Shut down and wait for in-flight requests to finish.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Err(e) = self.task.await {
            tracing::error!("API server task failed: {e}");
        }
    }
}

/// Bind to the configured address and serve until Ctrl-C.
pub async fn serve(core: Arc<CoreState>) -> std::io::Result<()> {
    let listener = TcpListener::bind(core.config.bind_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, model = %core.model_label(), "Triage API listening");

    let app = api_router(core).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(ctrl_c())
        .await?;

    tracing::info!("Triage API stopped");
    Ok(())
}

/// Start the API server on `addr` in a background task.
pub async fn start_server_on(core: Arc<CoreState>, addr: SocketAddr) -> std::io::Result<ApiServer> {
    let listener = TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;
    let app = api_router(core).into_make_service_with_connect_info::<SocketAddr>();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
        };

        tracing::info!(%addr, "API server started");
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }
        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
