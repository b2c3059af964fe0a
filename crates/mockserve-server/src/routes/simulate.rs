//! Simulated latency and failure endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use super::error_response;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/slow", get(get_slow))
        .route("/error", get(get_error))
}

/// GET /slow — responds after the configured fixed delay.
async fn get_slow(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    tokio::time::sleep(state.config.slow_delay()).await;
    Json(serde_json::json!({ "delayedMs": state.config.slow_delay_ms }))
}

/// GET /error — always fails.
async fn get_error() -> impl IntoResponse {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Simulated failure")
}
