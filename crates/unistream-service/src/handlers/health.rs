//! Health check handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Open WebSocket connections.
    pub connections: usize,
}

/// Health check endpoint. Reports `degraded` with 503 when the store is
/// unreachable.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let (status, code) = match state.store.ping().await {
        Ok(()) => ("ok", StatusCode::OK),
        Err(e) => {
            tracing::error!(error = %e, "Store health check failed");
            ("degraded", StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            service: "unistream".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            connections: state.hub.connection_count(),
        }),
    )
}
