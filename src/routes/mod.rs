//! HTTP route definitions and handlers.
//!
//! The flush ingress, Prometheus exposition and health checks.

mod flush_routes;
mod health_routes;
mod metrics;

use crate::state::AppState;
use axum::Router;

/// Creates the application router with all configured routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(flush_routes::routes())
        .merge(metrics::routes())
        .merge(health_routes::routes())
        .with_state(state)
}
