//! Ledger storage for unistream.
//!
//! This crate persists users, the gift and coin-pack catalog, ledger
//! transactions, subscriptions and chat history.
//!
//! # Backends
//!
//! - [`PgStore`]: PostgreSQL through `sqlx`. Balance mutations are single
//!   conditional `UPDATE` statements inside a database transaction, so
//!   concurrent requests from several service instances can never drive a
//!   balance negative or complete a transaction twice.
//! - [`MemoryStore`]: a process-local store guarded by one mutex, used for
//!   development and tests.
//!
//! # Tables
//!
//! `users`, `gifts`, `streamer_gifts`, `coin_packs`, `transactions`,
//! `subscriptions` and `messages`. See `migrations/` for the DDL and
//! [`queries`] for the statements run against them.
//!
//! # Example
//!
//! ```no_run
//! use unistream_core::{Role, User};
//! use unistream_store::{MemoryStore, Store};
//!
//! # async fn demo() -> unistream_store::Result<()> {
//! let store = MemoryStore::with_defaults();
//! let user = User::new("ana@ulima.edu.pe", "Ana", "hash", Role::Fan);
//! store.create_user(&user).await?;
//! let fetched = store.get_user(&user.id).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;
pub mod queries;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use unistream_core::{
    ChatHistoryEntry, ChatMessage, CoinPack, Gift, GiftId, NewGift, PanelGift, PointEarning,
    ProfileUpdate, SessionSummary, Subscription, Transaction, TransactionId, User, UserId,
};

/// Result of [`Store::complete_transaction`].
#[derive(Debug, Clone)]
pub struct Completion {
    /// The transaction in its final state.
    pub transaction: Transaction,
    /// The owning user after the credit.
    pub user: User,
    /// `true` when the transaction was already `COMPLETED` and nothing was applied.
    pub already_completed: bool,
    /// Whether a new subscription row was created.
    pub subscription_created: bool,
}

/// Result of [`Store::stop_live`].
#[derive(Debug, Clone)]
pub struct StoppedSession {
    /// The streamer after the live fields were cleared.
    pub user: User,
    /// Hours credited and the new total.
    pub summary: SessionSummary,
}

/// The storage trait defining all database operations.
///
/// Every method that moves coins or points is a single atomic step: the
/// check and the mutation happen together, and the ledger entry is written
/// in the same unit.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Health
    // =========================================================================

    /// Round-trip to the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable.
    async fn ping(&self) -> Result<()>;

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the email is already registered.
    async fn create_user(&self, user: &User) -> Result<()>;

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Get a user by login email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Consume a pending verification token, mark its account verified and
    /// return it. Unknown or already used tokens yield `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn verify_user(&self, token: &str) -> Result<Option<User>>;

    /// Apply the provided profile fields and return the updated user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn update_profile(&self, id: &UserId, update: &ProfileUpdate) -> Result<User>;

    /// Set the points-per-level threshold.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn set_level_threshold(&self, id: &UserId, threshold: i64) -> Result<User>;

    /// Set (or clear) the message shown to cancelling subscribers.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn set_goodbye_message(&self, id: &UserId, message: Option<&str>) -> Result<User>;

    /// Delete a user and everything that references them.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn delete_user(&self, id: &UserId) -> Result<()>;

    /// Every user currently broadcasting, most recent start first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_live_streamers(&self) -> Result<Vec<User>>;

    /// Unconditionally credit points. Returns the new point balance.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn add_points(&self, id: &UserId, points: i64) -> Result<i64>;

    // =========================================================================
    // Catalog
    // =========================================================================

    /// All gifts, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_gifts(&self) -> Result<Vec<Gift>>;

    /// Get a gift by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_gift(&self, id: GiftId) -> Result<Option<Gift>>;

    /// Insert a gift. A gift with an owner is activated on the owner's panel
    /// in the same step.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn create_gift(&self, gift: &NewGift) -> Result<Gift>;

    /// Delete a gift and its activation rows.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the gift doesn't exist.
    async fn delete_gift(&self, id: GiftId) -> Result<()>;

    /// Default gifts plus `streamer`'s custom gifts, with panel flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_panel_gifts(&self, streamer: &UserId) -> Result<Vec<PanelGift>>;

    /// Flip the activation row for `(streamer, gift)`. Returns whether the
    /// row exists afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn toggle_gift_activation(&self, streamer: &UserId, gift: GiftId) -> Result<bool>;

    /// Coin packs on sale, smallest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_coin_packs(&self) -> Result<Vec<CoinPack>>;

    /// Get a coin pack by id, including inactive ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_coin_pack(&self, id: i64) -> Result<Option<CoinPack>>;

    // =========================================================================
    // Ledger
    // =========================================================================

    /// Insert a ledger entry as-is.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the owner doesn't exist.
    async fn create_transaction(&self, transaction: &Transaction) -> Result<()>;

    /// Get a transaction by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>>;

    /// List a user's transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>>;

    /// Every streamer-directed, point-earning entry of `fan_id` (any status),
    /// joined with the streamer's current name and threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_point_earnings(&self, fan_id: &UserId) -> Result<Vec<PointEarning>>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Apply a gift receipt: debit `amount` coins, credit `points` and insert
    /// the entry, all only if the sender still holds enough coins.
    ///
    /// Returns the sender after the mutation.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the sender doesn't exist.
    /// - `StoreError::InsufficientFunds` if the conditional debit matched nothing.
    async fn apply_gift(&self, receipt: &Transaction) -> Result<User>;

    /// Move a `PENDING` transaction to `COMPLETED` and apply its credit.
    ///
    /// Subscription entries open the subscription (when absent) and credit
    /// points; other entries credit coins and points. A transaction that is
    /// already `COMPLETED` is returned unchanged with `already_completed`.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the transaction or its owner doesn't exist.
    async fn complete_transaction(&self, id: &TransactionId) -> Result<Completion>;

    /// Exchange `points_cost` points for `coins_granted` coins.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the user doesn't exist.
    /// - `StoreError::InsufficientPoints` if the conditional debit matched nothing.
    async fn redeem_points(
        &self,
        user_id: &UserId,
        points_cost: i64,
        coins_granted: i64,
    ) -> Result<User>;

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Get the subscription of `subscriber` to `streamer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_subscription(
        &self,
        subscriber: &UserId,
        streamer: &UserId,
    ) -> Result<Option<Subscription>>;

    /// Delete the subscription, returning it if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn delete_subscription(
        &self,
        subscriber: &UserId,
        streamer: &UserId,
    ) -> Result<Option<Subscription>>;

    // =========================================================================
    // Live Sessions
    // =========================================================================

    /// Mark the streamer live at `now`. An existing checkpoint is kept; only
    /// the title and category are refreshed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn start_live(
        &self,
        id: &UserId,
        title: &str,
        category: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<User>;

    /// Close the running broadcast: credit `now - checkpoint` hours and clear
    /// the live fields in one step.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the user doesn't exist.
    /// - `StoreError::InvalidState` if the user is not live.
    async fn stop_live(&self, id: &UserId, now: DateTime<Utc>) -> Result<StoppedSession>;

    // =========================================================================
    // Chat
    // =========================================================================

    /// Persist a chat message.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_message(&self, message: &ChatMessage) -> Result<()>;

    /// The latest `limit` messages (optionally of one room), oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_messages(
        &self,
        stream_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ChatHistoryEntry>>;
}
