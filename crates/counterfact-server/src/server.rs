//! HTTP server lifecycle.
//!
//! [`start_server`] binds the configured address and serves the router
//! until the process is terminated or `Ctrl-C` is received.

use std::net::SocketAddr;
use std::sync::Arc;

use counterfact_core::config::ServerConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Serve the session API on `server.host:server.port` until `Ctrl-C`.
///
/// # Errors
///
/// [`ServerError::Bind`] when the configured address does not parse or is
/// taken; [`ServerError::Serve`] when serving stops with an I/O error.
pub async fn start_server(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let router = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "Counterfact server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))?;

    info!("Counterfact server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

/// Failures of the HTTP listener.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listen address is invalid or unavailable.
    #[error("cannot listen: {0}")]
    Bind(String),

    /// Serving ended with an I/O error.
    #[error("server failed: {0}")]
    Serve(String),
}
