use anyhow::{Context, Result};
use tokio::sync::watch;
use std::sync::Arc;

use super::routes::create_router;
use super::AppState;

pub async fn start_server(
    state: Arc<AppState>,
    bind_addr: &str,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let app = create_router()
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Persona API server listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await?;

    Ok(())
}

async fn shutdown_signal(mut shutdown_rx: watch::Receiver<bool>) {
    // Wait for shutdown signal
    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }
    tracing::info!("Shutting down API server...");
}
