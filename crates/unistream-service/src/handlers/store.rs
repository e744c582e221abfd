//! Shop catalog and point redemption.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use unistream_core::{CoinPack, Gift, REDEEM_COINS_GRANTED, REDEEM_POINTS_COST};

use crate::auth::AuthUser;
use crate::economy;
use crate::error::ApiError;
use crate::handlers::parse_user_id;
use crate::state::AppState;

/// Gift catalog query parameters.
#[derive(Debug, Deserialize)]
pub struct GiftsQuery {
    /// Only the gifts currently offered on this streamer's channel.
    pub streamer_id: Option<String>,
}

/// Gift catalog response.
#[derive(Debug, Serialize)]
pub struct GiftsResponse {
    /// Gifts, cheapest first.
    pub gifts: Vec<Gift>,
}

/// List gifts: the whole catalog, or one channel's active gifts.
pub async fn list_gifts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GiftsQuery>,
) -> Result<Json<GiftsResponse>, ApiError> {
    let gifts = match query.streamer_id.as_deref() {
        Some(raw) => {
            let streamer_id = parse_user_id(raw)?;
            economy::channel_gifts(state.store.as_ref(), &streamer_id).await?
        }
        None => state.store.list_gifts().await?,
    };
    Ok(Json(GiftsResponse { gifts }))
}

/// Coin pack response.
#[derive(Debug, Serialize)]
pub struct PacksResponse {
    /// Packs on sale, smallest first.
    pub packs: Vec<CoinPack>,
}

/// List coin packs on sale.
pub async fn list_packs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PacksResponse>, ApiError> {
    let packs = state.store.list_coin_packs().await?;
    Ok(Json(PacksResponse { packs }))
}

/// Redemption response.
#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    /// Coins after the exchange.
    pub coins: i64,
    /// Points after the exchange.
    pub points: i64,
    /// Points consumed.
    pub points_spent: i64,
    /// Coins granted.
    pub coins_granted: i64,
}

/// Exchange points for coins.
pub async fn redeem(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<RedeemResponse>, ApiError> {
    let user = economy::redeem_points(state.store.as_ref(), &auth.user_id).await?;
    Ok(Json(RedeemResponse {
        coins: user.coins,
        points: user.points,
        points_spent: REDEEM_POINTS_COST,
        coins_granted: REDEEM_COINS_GRANTED,
    }))
}
