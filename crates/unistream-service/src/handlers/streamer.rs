//! Streamer settings and gift panel handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use unistream_core::{Gift, GiftId, PanelGift};

use crate::auth::AuthUser;
use crate::economy::{self, CustomGiftRequest};
use crate::error::ApiError;
use crate::handlers::parse_gift_id;
use crate::handlers::users::UserResponse;
use crate::state::AppState;

/// Settings update request.
#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    /// Points per level demanded from the community.
    pub level_threshold: i64,
}

/// Change the community level threshold.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<SettingsRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user =
        economy::update_threshold(state.store.as_ref(), &auth.user_id, body.level_threshold).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// Goodbye message request.
#[derive(Debug, Deserialize)]
pub struct GoodbyeRequest {
    /// New message; `null` or blank restores the default.
    pub message: Option<String>,
}

/// Set the farewell shown to cancelling subscribers.
pub async fn set_goodbye_message(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<GoodbyeRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = economy::set_goodbye_message(
        state.store.as_ref(),
        &auth.user_id,
        body.message.as_deref(),
    )
    .await?;
    Ok(Json(UserResponse::from(&user)))
}

/// Gift panel response.
#[derive(Debug, Serialize)]
pub struct PanelResponse {
    /// Defaults plus the streamer's own gifts.
    pub gifts: Vec<PanelGift>,
}

/// The caller's gift configuration panel.
pub async fn gift_panel(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<PanelResponse>, ApiError> {
    let gifts = economy::streamer_gift_panel(state.store.as_ref(), &auth.user_id).await?;
    Ok(Json(PanelResponse { gifts }))
}

/// Create a custom gift.
pub async fn create_gift(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CustomGiftRequest>,
) -> Result<(StatusCode, Json<Gift>), ApiError> {
    let gift = economy::create_custom_gift(state.store.as_ref(), &auth.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(gift)))
}

/// Delete one of the caller's custom gifts.
pub async fn delete_gift(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let gift_id = parse_gift_id(&id)?;
    economy::delete_gift(state.store.as_ref(), &auth.user_id, gift_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Toggle response.
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    /// The gift.
    pub gift_id: GiftId,
    /// Whether fans can send it now.
    pub is_active: bool,
}

/// Turn one of the caller's custom gifts on or off.
pub async fn toggle_gift(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let gift_id = parse_gift_id(&id)?;
    let is_active =
        economy::toggle_gift_activation(state.store.as_ref(), &auth.user_id, gift_id).await?;
    Ok(Json(ToggleResponse { gift_id, is_active }))
}
