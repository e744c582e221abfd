//! Chat history.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use unistream_core::ChatHistoryEntry;

use crate::error::ApiError;
use crate::state::AppState;

/// Largest page of history served at once.
const MAX_HISTORY: usize = 200;

/// History query parameters.
#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    /// Room to read; all rooms when absent.
    pub stream_id: Option<String>,
    /// Number of latest messages (default: 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// History response.
#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    /// Latest messages, oldest first.
    pub messages: Vec<ChatHistoryEntry>,
}

/// Latest chat messages of a room.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let messages = state
        .store
        .list_messages(query.stream_id.as_deref(), query.limit.min(MAX_HISTORY))
        .await?;
    Ok(Json(MessagesResponse { messages }))
}
