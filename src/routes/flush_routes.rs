//! Flush ingress: statsd (or a shim in front of it) posts each flush here.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::post, Json, Router};
use tracing::{error, warn};

use crate::flush::FlushEvent;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Registers the flush route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/flush", post(flush))
}

/// Runs one flush to completion before responding.
///
/// Malformed payloads are rejected here; once a flush is accepted it always
/// completes with 200, whatever happened to individual metrics. The flush
/// runs on its own task so a sender hanging up mid-delivery cannot cancel it.
async fn flush(
    State(state): State<AppState>,
    payload: Result<Json<FlushEvent>, JsonRejection>,
) -> Result<StatusCode, HTTPError> {
    let Json(event) = payload.map_err(|rejection| {
        warn!(
            event_name = "flush.rejected",
            event_domain = "flush",
            "Rejected flush payload: {}",
            rejection.body_text()
        );
        HTTPError::new(rejection.status(), rejection.body_text())
    })?;

    state.processor.spawn_flush(event).await.map_err(|e| {
        error!(
            event_name = "flush.task_failed",
            event_domain = "flush",
            "Flush task failed: {}",
            e
        );
        HTTPError::new(StatusCode::INTERNAL_SERVER_ERROR, "Flush failed")
    })?;
    Ok(StatusCode::OK)
}
