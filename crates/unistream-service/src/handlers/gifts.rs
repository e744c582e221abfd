//! Gift sending.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use unistream_core::{GiftId, RealtimeEvent, UserId};

use crate::auth::AuthUser;
use crate::economy::{self, GiftOutcome};
use crate::error::ApiError;
use crate::notifier::dispatch_to_room;
use crate::state::AppState;

/// Send gift request.
#[derive(Debug, Deserialize)]
pub struct SendGiftRequest {
    /// Receiving streamer.
    pub streamer_id: UserId,
    /// Catalog gift.
    pub gift_id: GiftId,
}

/// Send a gift to a streamer and alert their room.
pub async fn send_gift(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<SendGiftRequest>,
) -> Result<Json<GiftOutcome>, ApiError> {
    let outcome = economy::send_gift(
        state.store.as_ref(),
        &auth.user_id,
        &body.streamer_id,
        body.gift_id,
    )
    .await?;

    dispatch_to_room(
        state.notifier.as_ref(),
        &body.streamer_id.to_string(),
        &RealtimeEvent::GiftAlert {
            streamer_id: body.streamer_id,
            gift_name: outcome.gift.name.clone(),
            gift_emoji: outcome.gift.emoji.clone(),
            sender_name: outcome.sender_name.clone(),
        },
    );

    Ok(Json(outcome))
}
