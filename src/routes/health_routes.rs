//! Health check endpoints.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

/// Registers health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Reports the service as up along with how many destinations it forwards to.
///
/// Every destination is initialized before the router exists, so reaching this
/// handler at all means startup completed.
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "OK",
        "destinations": state.processor.registry().destinations().len(),
    }))
}
