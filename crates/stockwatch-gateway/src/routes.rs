//! Route handlers. Static responses only.

use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;

use crate::server::AppState;

/// Service status.
pub async fn home(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "running",
        "service": state.service,
        "message": "Tracker is running in the background. Check logs for status.",
    }))
}

/// Health check endpoint.
pub async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({"status": "healthy"})))
}
