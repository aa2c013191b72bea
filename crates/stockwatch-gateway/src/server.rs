//! HTTP server implementation using Axum.

use axum::{Router, routing::get};
use std::sync::Arc;
use stockwatch_core::config::GatewayConfig;
use tower_http::trace::TraceLayer;

/// Shared state for the liveness server. Holds nothing the tracker writes to.
#[derive(Clone)]
pub struct AppState {
    /// Service name reported by `GET /`.
    pub service: String,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(super::routes::home))
        .route("/health", get(super::routes::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Start the HTTP server. Runs until the listener fails.
pub async fn start(config: &GatewayConfig, service: &str) -> anyhow::Result<()> {
    let app = build_router(AppState {
        service: service.to_string(),
    });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 Liveness server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
