//! Profile, community progress and ledger history handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use unistream_core::leveling::next_streamer_level_at;
use unistream_core::{
    LevelProgress, ProfileUpdate, Role, StreamerProgress, Transaction, User, UserId,
};

use crate::auth::AuthUser;
use crate::economy::require_user;
use crate::error::ApiError;
use crate::handlers::parse_user_id;
use crate::progress::community_progress;
use crate::state::AppState;

/// The signed-in user's own view of their account.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User ID.
    pub id: UserId,
    /// Login email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Fan or streamer.
    pub role: Role,
    /// Whether the email was confirmed.
    pub is_verified: bool,
    /// Bio.
    pub description: Option<String>,
    /// Coin balance.
    pub coins: i64,
    /// XP balance.
    pub points: i64,
    /// Level on the user's own threshold.
    pub level: LevelProgress,
    /// Points per level demanded from this streamer's community.
    pub level_threshold: i64,
    /// Broadcasting level.
    pub streamer_level: i64,
    /// Cumulative broadcast hours.
    pub total_live_hours: f64,
    /// Whether a broadcast is running.
    pub is_live: bool,
    /// Farewell for cancelling subscribers.
    pub goodbye_message: Option<String>,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            is_verified: user.is_verified,
            description: user.description.clone(),
            coins: user.coins,
            points: user.points,
            level: LevelProgress::compute(user.points, user.level_threshold),
            level_threshold: user.level_threshold,
            streamer_level: user.streamer_level(),
            total_live_hours: user.total_live_hours,
            is_live: user.is_live,
            goodbye_message: user.goodbye_message.clone(),
            created_at: user.created_at,
        }
    }
}

/// What anyone may see about a user.
#[derive(Debug, Serialize)]
pub struct PublicProfile {
    /// User ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Fan or streamer.
    pub role: Role,
    /// Whether the email was confirmed.
    pub is_verified: bool,
    /// Bio.
    pub description: Option<String>,
    /// Level on the user's own threshold.
    pub level: i64,
    /// Points per level of this streamer's community.
    pub level_threshold: i64,
    /// Broadcasting level.
    pub streamer_level: i64,
    /// Hours at which the next broadcasting level is reached.
    pub next_streamer_level_at: f64,
    /// Cumulative broadcast hours.
    pub total_live_hours: f64,
    /// Whether a broadcast is running.
    pub is_live: bool,
    /// Title of the running broadcast.
    pub stream_title: Option<String>,
    /// Category of the running broadcast.
    pub stream_category: Option<String>,
    /// Start checkpoint of the running broadcast.
    pub live_started_at: Option<DateTime<Utc>>,
}

impl From<User> for PublicProfile {
    fn from(user: User) -> Self {
        Self {
            level: user.level(),
            streamer_level: user.streamer_level(),
            next_streamer_level_at: next_streamer_level_at(user.total_live_hours),
            id: user.id,
            name: user.name,
            role: user.role,
            is_verified: user.is_verified,
            description: user.description,
            level_threshold: user.level_threshold,
            total_live_hours: user.total_live_hours,
            is_live: user.is_live,
            stream_title: user.stream_title,
            stream_category: user.stream_category,
            live_started_at: user.live_started_at,
        }
    }
}

/// Get the current user's account.
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = require_user(state.store.as_ref(), &auth.user_id).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// Update name, bio or role.
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(mut body): Json<ProfileUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    if let Some(name) = body.name.as_deref() {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::BadRequest("name cannot be empty".into()));
        }
        body.name = Some(name.to_string());
    }

    let user = state.store.update_profile(&auth.user_id, &body).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "Profile updated");
    Ok(Json(UserResponse::from(&user)))
}

/// Delete the current user's account and everything that references it.
pub async fn delete_me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<StatusCode, ApiError> {
    state.store.delete_user(&auth.user_id).await?;
    tracing::info!(user_id = %auth.user_id, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Public profile of any user.
pub async fn public_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PublicProfile>, ApiError> {
    let id = parse_user_id(&id)?;
    let user = require_user(state.store.as_ref(), &id).await?;
    Ok(Json(PublicProfile::from(user)))
}

/// Community progress response.
#[derive(Debug, Serialize)]
pub struct CommunityProgressResponse {
    /// One entry per supported streamer, highest XP first.
    pub streamers: Vec<StreamerProgress>,
}

/// The current user's level with every streamer they supported.
pub async fn get_community_progress(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<CommunityProgressResponse>, ApiError> {
    let streamers = community_progress(state.store.as_ref(), &auth.user_id).await?;
    Ok(Json(CommunityProgressResponse { streamers }))
}

/// Transaction list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Maximum number of transactions to return (default: 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<Transaction>,
    /// Whether there are more transactions.
    pub has_more: bool,
}

/// List the current user's ledger history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    require_user(state.store.as_ref(), &auth.user_id).await?;

    // Fetch one more than requested to determine has_more
    let limit = query.limit.min(100);
    let mut transactions = state
        .store
        .list_transactions_by_user(&auth.user_id, limit + 1, query.offset)
        .await?;

    let has_more = transactions.len() > limit;
    transactions.truncate(limit);

    Ok(Json(ListTransactionsResponse {
        transactions,
        has_more,
    }))
}
