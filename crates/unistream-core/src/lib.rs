//! Core types and math for the unistream platform.
//!
//! This crate provides the foundational types shared by the store, the
//! service and the client:
//!
//! - **Identifiers**: `UserId`, `TransactionId`, `MessageId`, `GiftId`
//! - **Accounts**: `User`, `Role`, `ProfileUpdate`
//! - **Catalog**: `Gift`, `PanelGift`, `CoinPack`
//! - **Ledger**: `Transaction`, `TransactionKind`, `TransactionStatus`, `Subscription`
//! - **Leveling**: `LevelProgress`, `LevelChange`, `StreamerProgress`
//! - **Realtime**: `RealtimeEvent`, `ChatMessage`
//!
//! # Virtual currencies
//!
//! - **Coins** are bought with real money and spent on gifts.
//! - **Points** (XP) are earned by spending coins, subscribing and chatting,
//!   and can be redeemed back into coins at 100 points per 10 coins.
//! - Both are stored as `i64` and never go negative.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod catalog;
pub mod chat;
pub mod error;
pub mod events;
pub mod ids;
pub mod leveling;
pub mod progress;
pub mod session;
pub mod transaction;
pub mod user;

pub use catalog::{
    default_coin_packs, default_gifts, CoinPack, Gift, NewGift, PanelGift, DEFAULT_COIN_PACKS,
    DEFAULT_GIFTS,
};
pub use chat::{ChatHistoryEntry, ChatMessage, MAX_CHAT_MESSAGE_CHARS};
pub use error::{EconomyError, Result};
pub use events::RealtimeEvent;
pub use ids::{GiftId, IdError, MessageId, TransactionId, UserId};
pub use leveling::{
    LevelChange, LevelProgress, DEFAULT_LEVEL_THRESHOLD, HOURS_PER_STREAMER_LEVEL,
    MIN_LEVEL_THRESHOLD,
};
pub use progress::{aggregate, PointEarning, StreamerProgress};
pub use session::{session_hours, SessionSummary};
pub use transaction::{
    gift_xp, Subscription, Transaction, TransactionKind, TransactionStatus, CHAT_MESSAGE_XP,
    REDEEM_COINS_GRANTED, REDEEM_POINTS_COST, SUBSCRIPTION_POINTS, SUBSCRIPTION_PRICE_CENTS,
    XP_PER_GIFT_COIN,
};
pub use user::{ProfileUpdate, Role, User, STARTING_COINS};
