//! Application startup and server initialization.
//!
//! Destinations are initialized before the router is built, so no flush can
//! reach the processor until every telemetry client exists.

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

use crate::backends::BackendRegistry;
use crate::config::ConfigV1;
use crate::flush::FlushProcessor;
use crate::metrics::Metrics;
use crate::routes;
use crate::state::AppState;

/// Initializes every configured destination and wires the flush processor.
///
/// # Errors
///
/// Fails if the metrics registry can't be built or any destination fails to
/// initialize; the first failing destination is named in the error.
pub fn build_state(config: Arc<ConfigV1>) -> Result<AppState, Box<dyn std::error::Error>> {
    let metrics = Metrics::new()?;

    info!(
        "Initializing {} Application Insights destinations...",
        config.appinsights.len()
    );
    let mut registry = BackendRegistry::from_config(&config);
    registry.initialize()?;

    let processor = FlushProcessor::new(
        Arc::new(registry),
        Arc::new(metrics.clone()),
        Duration::from_millis(config.flush.timeout_in_ms),
    )?;

    Ok(AppState {
        config,
        processor: Arc::new(processor),
        metrics,
    })
}

/// Initializes the destinations and serves the flush ingress until Ctrl-C.
///
/// # Errors
///
/// Returns an error if initialization fails, the server cannot bind to the
/// configured address, or serving fails.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(config.clone())?;
    let app = routes::create_router(state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("Registered for flush events on {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Flush ingress stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
