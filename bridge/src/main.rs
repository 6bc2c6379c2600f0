//! ClickHouse Bridge binary entry point.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bridge::server::BridgeServer;
use bridge::{BatchWriter, CliArgs, Metrics, create_store};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI arguments
    let args = CliArgs::parse();
    let config = args.to_config().unwrap_or_else(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });
    let write_timeout = config.write_timeout().unwrap_or_else(|e| {
        tracing::error!("{}", e);
        std::process::exit(1);
    });

    tracing::info!("Connecting to store");
    let store = create_store(&config.store).await.unwrap_or_else(|e| {
        tracing::error!("Failed to connect to store: {}", e);
        std::process::exit(1);
    });
    tracing::info!("Store {} is reachable", store.destination());

    let metrics = Arc::new(Metrics::new());
    let writer = BatchWriter::new(store, metrics.clone()).with_timeout(write_timeout);

    let server = BridgeServer::new(Arc::new(writer), metrics, config.listen_addr);
    if let Err(e) = server.run().await {
        tracing::error!("Server failed: {}", e);
        std::process::exit(1);
    }
}
