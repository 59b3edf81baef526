// Main entry point - Dependency injection and server setup
use std::sync::Arc;

use solar_telemetry_relay::infrastructure::clock::LocalClock;
use solar_telemetry_relay::infrastructure::config::load_relay_config;
use solar_telemetry_relay::{build_router, spawn_relay, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_relay_config()?;
    let clock = LocalClock::new(config.timestamp.format.clone())?;

    // History and fan-out live on the relay task for the life of the process
    let (relay, relay_task) = spawn_relay(
        config.history.capacity,
        config.clients.inbound_queue_capacity,
        Box::new(clock),
    );

    let state = Arc::new(AppState::new(
        relay,
        config.server.static_dir.clone(),
        config.clients.queue_capacity,
    ));
    let router = build_router(state);

    // Start server
    let addr = config.bind_addr()?;
    tracing::info!(
        "Relay listening on {} (history capacity {}, assets from {})",
        addr,
        config.history.capacity,
        config.server.static_dir.display()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    relay_task.abort();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
