//! Request and response types for the unistream client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use unistream_core::{GiftId, Role, TransactionId, TransactionKind, TransactionStatus, UserId};

pub use unistream_core::{CoinPack, Gift, RealtimeEvent, StreamerProgress, Transaction};

/// Registration request.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    /// Login email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Plain-text password.
    pub password: String,
    /// Fan or streamer.
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct VerifyRequest<'a> {
    pub token: &'a str,
}

/// Outcome of registering or verifying an account.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountNotice {
    /// What to do next.
    pub message: String,
    /// The account.
    pub user: Account,
}

/// A signed-in session.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    /// Bearer token for subsequent calls.
    pub token: String,
    /// The account.
    pub user: Account,
}

/// The signed-in user's account.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    /// User ID.
    pub id: UserId,
    /// Login email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Fan or streamer.
    pub role: Role,
    /// Whether the email was confirmed.
    #[serde(default)]
    pub is_verified: bool,
    /// Bio.
    #[serde(default)]
    pub description: Option<String>,
    /// Coin balance.
    pub coins: i64,
    /// XP balance.
    pub points: i64,
    /// Points per level of this streamer's community.
    pub level_threshold: i64,
    /// Broadcasting level.
    pub streamer_level: i64,
    /// Cumulative broadcast hours.
    pub total_live_hours: f64,
    /// Whether a broadcast is running.
    pub is_live: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendGiftRequest<'a> {
    pub streamer_id: &'a UserId,
    pub gift_id: GiftId,
}

/// Result of sending a gift.
#[derive(Debug, Clone, Deserialize)]
pub struct GiftReceipt {
    /// Ledger entry of the gift.
    pub transaction_id: TransactionId,
    /// Coins left.
    pub coins: i64,
    /// Points after the credit.
    pub points: i64,
    /// XP earned by this gift.
    pub xp_gained: i64,
    /// Whether the gift crossed a level boundary.
    pub level_up: bool,
    /// Level with the streamer after the gift.
    pub new_level: i64,
    /// Confirmation text for the sender.
    pub message: String,
}

/// Result of redeeming points.
#[derive(Debug, Clone, Deserialize)]
pub struct RedeemReceipt {
    /// Coins after the exchange.
    pub coins: i64,
    /// Points after the exchange.
    pub points: i64,
    /// Points taken.
    pub points_spent: i64,
    /// Coins given.
    pub coins_granted: i64,
}

/// What a checkout pays for.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutRequest {
    /// A coin pack from the catalog.
    Coins {
        /// Catalog id of the pack.
        pack_id: i64,
    },
    /// A channel subscription.
    Subscription {
        /// The channel.
        streamer_id: UserId,
    },
}

/// A pending checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct Checkout {
    /// Transaction to complete.
    pub transaction_id: TransactionId,
    /// Purchase or subscription.
    pub kind: TransactionKind,
    /// Coins bought, zero for subscriptions.
    pub amount: i64,
    /// Price in cents.
    pub price_cents: i64,
    /// Points awarded on completion.
    pub points: i64,
    /// Where to send the user to pay.
    pub checkout_url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CompleteRequest<'a> {
    pub transaction_id: &'a TransactionId,
}

/// A completed (or previously completed) checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct Completion {
    /// The transaction.
    pub transaction_id: TransactionId,
    /// Purchase or subscription.
    pub kind: TransactionKind,
    /// Status after the call.
    pub status: TransactionStatus,
    /// Coin balance after the call.
    pub coins: i64,
    /// Point balance after the call.
    pub points: i64,
    /// Subscribed channel, for subscriptions.
    #[serde(default)]
    pub target_streamer_id: Option<UserId>,
    /// Whether the transaction had already been applied.
    pub already_completed: bool,
    /// Whether a subscription record was created.
    pub subscription_created: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct StartStreamRequest<'a> {
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<&'a str>,
}

/// A broadcast in the live directory.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveStream {
    /// The streamer.
    pub streamer_id: UserId,
    /// Streamer display name.
    pub name: String,
    /// Broadcast title.
    #[serde(default)]
    pub title: Option<String>,
    /// Broadcast category.
    #[serde(default)]
    pub category: Option<String>,
    /// Server-side start checkpoint.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// Broadcasting level of the streamer.
    pub streamer_level: i64,
}

/// Result of ending a broadcast.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamStopped {
    /// The streamer.
    pub streamer_id: UserId,
    /// Hours credited for this session.
    pub session_hours: f64,
    /// Cumulative broadcast hours.
    pub total_hours: f64,
    /// Broadcasting level after the credit.
    pub streamer_level: i64,
    /// Hours at which the next broadcasting level is reached.
    pub next_level_at: f64,
}

/// Subscription state for one channel.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionStatus {
    /// The channel.
    pub streamer_id: UserId,
    /// Whether a subscription exists.
    pub subscribed: bool,
    /// When it started.
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    /// Whole days subscribed.
    pub days_subscribed: i64,
}

/// Result of cancelling a subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct Unsubscribed {
    /// Whole days the subscription lasted.
    pub days_subscribed: i64,
    /// The streamer's farewell.
    pub goodbye_message: String,
}

// Envelopes the service wraps lists in.

#[derive(Debug, Deserialize)]
pub(crate) struct GiftsEnvelope {
    pub gifts: Vec<Gift>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PacksEnvelope {
    pub packs: Vec<CoinPack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamsEnvelope {
    pub streams: Vec<LiveStream>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProgressEnvelope {
    pub streamers: Vec<StreamerProgress>,
}

/// A page of ledger history.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionPage {
    /// Transactions, newest first.
    pub transactions: Vec<Transaction>,
    /// Whether more pages exist.
    pub has_more: bool,
}

/// API error response format.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}
