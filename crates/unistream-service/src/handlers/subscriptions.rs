//! Subscription status and cancellation.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::auth::AuthUser;
use crate::economy::{self, SubscriptionStatus, Unsubscribed};
use crate::error::ApiError;
use crate::handlers::parse_user_id;
use crate::state::AppState;

/// Whether the caller is subscribed to a streamer.
pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(streamer_id): Path<String>,
) -> Result<Json<SubscriptionStatus>, ApiError> {
    let streamer_id = parse_user_id(&streamer_id)?;
    let status =
        economy::subscription_status(state.store.as_ref(), &auth.user_id, &streamer_id).await?;
    Ok(Json(status))
}

/// Cancel the caller's subscription to a streamer.
pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(streamer_id): Path<String>,
) -> Result<Json<Unsubscribed>, ApiError> {
    let streamer_id = parse_user_id(&streamer_id)?;
    let result = economy::unsubscribe(state.store.as_ref(), &auth.user_id, &streamer_id).await?;
    Ok(Json(result))
}
