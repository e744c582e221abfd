//! Live session handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::sessions::{self, LiveStream, StreamStopped};
use crate::state::AppState;

/// Start stream request.
#[derive(Debug, Deserialize)]
pub struct StartStreamRequest {
    /// Broadcast title.
    pub title: String,
    /// Broadcast category.
    #[serde(default)]
    pub category: Option<String>,
}

/// Go live.
pub async fn start_stream(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<StartStreamRequest>,
) -> Result<Json<LiveStream>, ApiError> {
    if body.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".into()));
    }
    let live = sessions::start(
        state.store.as_ref(),
        state.notifier.as_ref(),
        &auth.user_id,
        &body.title,
        body.category.as_deref(),
    )
    .await?;
    Ok(Json(live))
}

/// End the running broadcast.
pub async fn stop_stream(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<StreamStopped>, ApiError> {
    let stopped = sessions::stop(state.store.as_ref(), state.notifier.as_ref(), &auth.user_id).await?;
    Ok(Json(stopped))
}

/// Live directory response.
#[derive(Debug, Serialize)]
pub struct LiveStreamsResponse {
    /// Running broadcasts, most recent first.
    pub streams: Vec<LiveStream>,
}

/// List running broadcasts.
pub async fn live_streams(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LiveStreamsResponse>, ApiError> {
    let streams = sessions::live_streams(state.store.as_ref()).await?;
    Ok(Json(LiveStreamsResponse { streams }))
}
