//! HTTP server implementation for the bridge.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::signal;

use super::handlers::{AppState, handle_healthy, handle_metrics, handle_ready, handle_receive};
use crate::error::Result;
use crate::metrics::Metrics;
use crate::writer::BatchWriter;

/// Build the bridge's router.
///
/// `/api/v1/write` is an alias of `/receive` for agents configured with the
/// conventional remote write path. Request bodies are not size limited:
/// agents batch freely and large pushes must not be turned away with 413.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/receive", post(handle_receive))
        .route("/api/v1/write", post(handle_receive))
        .route("/metrics", get(handle_metrics))
        .route("/-/healthy", get(handle_healthy))
        .route("/-/ready", get(handle_ready))
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

/// HTTP server receiving remote write pushes.
pub struct BridgeServer {
    writer: Arc<BatchWriter>,
    metrics: Arc<Metrics>,
    listen_addr: SocketAddr,
}

impl BridgeServer {
    pub fn new(writer: Arc<BatchWriter>, metrics: Arc<Metrics>, listen_addr: SocketAddr) -> Self {
        Self {
            writer,
            metrics,
            listen_addr,
        }
    }

    /// Run the HTTP server until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let state = AppState {
            writer: self.writer,
            metrics: self.metrics,
        };
        let app = router(state);

        let listener = tokio::net::TcpListener::bind(self.listen_addr).await?;
        tracing::info!("Listening at: {}", self.listen_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shut down gracefully");
        Ok(())
    }
}

/// Listen for SIGTERM and SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
