//! In-memory store implementation.
//!
//! All state lives behind a single mutex that is held for the whole of each
//! compound operation, which gives the same all-or-nothing behaviour as the
//! database backend within one process.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use unistream_core::{
    default_coin_packs, default_gifts, session_hours, ChatHistoryEntry, ChatMessage, CoinPack,
    Gift, GiftId, NewGift, PanelGift, PointEarning, ProfileUpdate, SessionSummary, Subscription,
    Transaction, TransactionId, TransactionStatus, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::{Completion, StoppedSession, Store};

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, User>,
    gifts: BTreeMap<i64, Gift>,
    next_gift_id: i64,
    activations: HashSet<(UserId, GiftId)>,
    coin_packs: Vec<CoinPack>,
    transactions: HashMap<TransactionId, Transaction>,
    subscriptions: HashMap<(UserId, UserId), Subscription>,
    messages: Vec<ChatMessage>,
}

impl Inner {
    fn user_mut(&mut self, id: &UserId) -> Result<&mut User> {
        self.users
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    fn insert_gift(&mut self, gift: &NewGift) -> Gift {
        self.next_gift_id += 1;
        let created = Gift {
            id: GiftId(self.next_gift_id),
            name: gift.name.clone(),
            cost: gift.cost,
            emoji: gift.emoji.clone(),
            owner_id: gift.owner_id,
        };
        self.gifts.insert(created.id.0, created.clone());
        if let Some(owner) = gift.owner_id {
            self.activations.insert((owner, created.id));
        }
        created
    }
}

/// Process-local [`Store`] backend.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store with no catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Create a store seeded with the default gifts and coin packs.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut inner = Inner::default();
        for gift in default_gifts() {
            inner.insert_gift(&gift);
        }
        inner.coin_packs = default_coin_packs();
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Overwrite a user's balances. Test and seeding helper.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    pub fn set_balances(&self, id: &UserId, coins: i64, points: i64) -> Result<()> {
        let mut inner = self.lock()?;
        let user = inner.user_mut(id)?;
        user.coins = coins;
        user.points = points;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.lock().map(|_| ())
    }

    // =========================================================================
    // Users
    // =========================================================================

    async fn create_user(&self, user: &User) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email already registered: {}",
                user.email
            )));
        }
        if inner.users.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("user already exists: {}", user.id)));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.lock()?.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn verify_user(&self, token: &str) -> Result<Option<User>> {
        let mut inner = self.lock()?;
        let Some(user) = inner
            .users
            .values_mut()
            .find(|u| u.verification_token.as_deref() == Some(token))
        else {
            return Ok(None);
        };
        user.is_verified = true;
        user.verification_token = None;
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_profile(&self, id: &UserId, update: &ProfileUpdate) -> Result<User> {
        let mut inner = self.lock()?;
        let user = inner.user_mut(id)?;
        if let Some(name) = &update.name {
            user.name.clone_from(name);
        }
        if let Some(description) = &update.description {
            user.description = Some(description.clone());
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_level_threshold(&self, id: &UserId, threshold: i64) -> Result<User> {
        let mut inner = self.lock()?;
        let user = inner.user_mut(id)?;
        user.level_threshold = threshold;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_goodbye_message(&self, id: &UserId, message: Option<&str>) -> Result<User> {
        let mut inner = self.lock()?;
        let user = inner.user_mut(id)?;
        user.goodbye_message = message.map(str::to_string);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &UserId) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.users.remove(id).is_none() {
            return Err(StoreError::not_found("user", id));
        }
        inner.gifts.retain(|_, g| g.owner_id.as_ref() != Some(id));
        let remaining: HashSet<GiftId> = inner.gifts.values().map(|g| g.id).collect();
        inner
            .activations
            .retain(|(streamer, gift)| streamer != id && remaining.contains(gift));
        inner
            .transactions
            .retain(|_, tx| tx.user_id != *id && tx.target_streamer_id.as_ref() != Some(id));
        inner
            .subscriptions
            .retain(|(subscriber, streamer), _| subscriber != id && streamer != id);
        inner.messages.retain(|m| m.user_id != *id);
        Ok(())
    }

    async fn list_live_streamers(&self) -> Result<Vec<User>> {
        let inner = self.lock()?;
        let mut live: Vec<User> = inner.users.values().filter(|u| u.is_live).cloned().collect();
        live.sort_by(|a, b| b.live_started_at.cmp(&a.live_started_at));
        Ok(live)
    }

    async fn add_points(&self, id: &UserId, points: i64) -> Result<i64> {
        let mut inner = self.lock()?;
        let user = inner.user_mut(id)?;
        user.points += points;
        Ok(user.points)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    async fn list_gifts(&self) -> Result<Vec<Gift>> {
        let mut gifts: Vec<Gift> = self.lock()?.gifts.values().cloned().collect();
        gifts.sort_by_key(|g| (g.cost, g.id));
        Ok(gifts)
    }

    async fn get_gift(&self, id: GiftId) -> Result<Option<Gift>> {
        Ok(self.lock()?.gifts.get(&id.0).cloned())
    }

    async fn create_gift(&self, gift: &NewGift) -> Result<Gift> {
        let mut inner = self.lock()?;
        if let Some(owner) = &gift.owner_id {
            if !inner.users.contains_key(owner) {
                return Err(StoreError::not_found("user", owner));
            }
        }
        Ok(inner.insert_gift(gift))
    }

    async fn delete_gift(&self, id: GiftId) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.gifts.remove(&id.0).is_none() {
            return Err(StoreError::not_found("gift", id));
        }
        inner.activations.retain(|(_, gift)| *gift != id);
        Ok(())
    }

    async fn list_panel_gifts(&self, streamer: &UserId) -> Result<Vec<PanelGift>> {
        let inner = self.lock()?;
        let mut panel: Vec<PanelGift> = inner
            .gifts
            .values()
            .filter(|g| g.is_default() || g.owner_id.as_ref() == Some(streamer))
            .map(|g| PanelGift {
                is_active: g.is_active_for(inner.activations.contains(&(*streamer, g.id))),
                is_custom: !g.is_default(),
                gift: g.clone(),
            })
            .collect();
        panel.sort_by_key(|p| (p.gift.cost, p.gift.id));
        Ok(panel)
    }

    async fn toggle_gift_activation(&self, streamer: &UserId, gift: GiftId) -> Result<bool> {
        let mut inner = self.lock()?;
        let key = (*streamer, gift);
        if inner.activations.remove(&key) {
            Ok(false)
        } else {
            inner.activations.insert(key);
            Ok(true)
        }
    }

    async fn list_coin_packs(&self) -> Result<Vec<CoinPack>> {
        let mut packs: Vec<CoinPack> = self
            .lock()?
            .coin_packs
            .iter()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        packs.sort_by_key(|p| p.coins);
        Ok(packs)
    }

    async fn get_coin_pack(&self, id: i64) -> Result<Option<CoinPack>> {
        Ok(self.lock()?.coin_packs.iter().find(|p| p.id == id).cloned())
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    async fn create_transaction(&self, transaction: &Transaction) -> Result<()> {
        let mut inner = self.lock()?;
        if !inner.users.contains_key(&transaction.user_id) {
            return Err(StoreError::not_found("user", transaction.user_id));
        }
        inner.transactions.insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        Ok(self.lock()?.transactions.get(id).cloned())
    }

    async fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>> {
        let inner = self.lock()?;
        let mut txs: Vec<&Transaction> = inner
            .transactions
            .values()
            .filter(|tx| tx.user_id == *user_id)
            .collect();
        txs.sort_by(|a, b| b.id.as_ulid().cmp(a.id.as_ulid()));
        Ok(txs.into_iter().skip(offset).take(limit).cloned().collect())
    }

    async fn list_point_earnings(&self, user_id: &UserId) -> Result<Vec<PointEarning>> {
        let inner = self.lock()?;
        Ok(inner
            .transactions
            .values()
            .filter(|tx| tx.user_id == *user_id && tx.points > 0)
            .filter_map(|tx| {
                let streamer = inner.users.get(tx.target_streamer_id.as_ref()?)?;
                Some(PointEarning {
                    streamer_id: streamer.id,
                    streamer_name: streamer.name.clone(),
                    streamer_threshold: streamer.level_threshold,
                    points: tx.points,
                })
            })
            .collect())
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    async fn apply_gift(&self, receipt: &Transaction) -> Result<User> {
        let mut inner = self.lock()?;
        let sender = inner.user_mut(&receipt.user_id)?;
        if sender.coins < receipt.amount {
            return Err(StoreError::InsufficientFunds {
                balance: sender.coins,
                required: receipt.amount,
            });
        }
        sender.coins -= receipt.amount;
        sender.points += receipt.points;
        sender.updated_at = Utc::now();
        let sender = sender.clone();
        inner.transactions.insert(receipt.id, receipt.clone());
        Ok(sender)
    }

    async fn complete_transaction(&self, id: &TransactionId) -> Result<Completion> {
        let mut inner = self.lock()?;
        let mut transaction = inner
            .transactions
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("transaction", id))?;

        if transaction.status == TransactionStatus::Completed {
            let user = inner.user_mut(&transaction.user_id)?.clone();
            return Ok(Completion {
                transaction,
                user,
                already_completed: true,
                subscription_created: false,
            });
        }

        let mut subscription_created = false;
        let subscribe_to = transaction
            .target_streamer_id
            .filter(|_| transaction.grants_subscription());
        if let Some(streamer) = subscribe_to {
            // Owner must exist before the subscription row is created.
            inner.user_mut(&transaction.user_id)?;
            let key = (transaction.user_id, streamer);
            if !inner.subscriptions.contains_key(&key) {
                inner
                    .subscriptions
                    .insert(key, Subscription::new(transaction.user_id, streamer));
                subscription_created = true;
            }
        }

        let coins = transaction.coins_on_completion();
        let user = inner.user_mut(&transaction.user_id)?;
        user.coins += coins;
        user.points += transaction.points;
        user.updated_at = Utc::now();
        let user = user.clone();

        transaction.status = TransactionStatus::Completed;
        transaction.completed_at = Some(Utc::now());
        inner.transactions.insert(transaction.id, transaction.clone());

        Ok(Completion {
            transaction,
            user,
            already_completed: false,
            subscription_created,
        })
    }

    async fn redeem_points(
        &self,
        user_id: &UserId,
        points_cost: i64,
        coins_granted: i64,
    ) -> Result<User> {
        let mut inner = self.lock()?;
        let user = inner.user_mut(user_id)?;
        if user.points < points_cost {
            return Err(StoreError::InsufficientPoints {
                balance: user.points,
                required: points_cost,
            });
        }
        user.points -= points_cost;
        user.coins += coins_granted;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    async fn get_subscription(
        &self,
        subscriber: &UserId,
        streamer: &UserId,
    ) -> Result<Option<Subscription>> {
        Ok(self
            .lock()?
            .subscriptions
            .get(&(*subscriber, *streamer))
            .cloned())
    }

    async fn delete_subscription(
        &self,
        subscriber: &UserId,
        streamer: &UserId,
    ) -> Result<Option<Subscription>> {
        Ok(self
            .lock()?
            .subscriptions
            .remove(&(*subscriber, *streamer)))
    }

    // =========================================================================
    // Live Sessions
    // =========================================================================

    async fn start_live(
        &self,
        id: &UserId,
        title: &str,
        category: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let mut inner = self.lock()?;
        let user = inner.user_mut(id)?;
        if !(user.is_live && user.live_started_at.is_some()) {
            user.live_started_at = Some(now);
        }
        user.is_live = true;
        user.stream_title = Some(title.to_string());
        user.stream_category = category.map(str::to_string);
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn stop_live(&self, id: &UserId, now: DateTime<Utc>) -> Result<StoppedSession> {
        let mut inner = self.lock()?;
        let user = inner.user_mut(id)?;
        if !user.is_live {
            return Err(StoreError::InvalidState(format!("user {id} is not live")));
        }
        let had_checkpoint = user.live_started_at.is_some();
        let hours = session_hours(user.live_started_at, now);
        user.total_live_hours += hours;
        user.is_live = false;
        user.live_started_at = None;
        user.stream_title = None;
        user.stream_category = None;
        user.updated_at = now;
        Ok(StoppedSession {
            summary: SessionSummary {
                session_hours: hours,
                total_hours: user.total_live_hours,
                had_checkpoint,
            },
            user: user.clone(),
        })
    }

    // =========================================================================
    // Chat
    // =========================================================================

    async fn insert_message(&self, message: &ChatMessage) -> Result<()> {
        let mut inner = self.lock()?;
        if !inner.users.contains_key(&message.user_id) {
            return Err(StoreError::not_found("user", message.user_id));
        }
        inner.messages.push(message.clone());
        Ok(())
    }

    async fn list_messages(
        &self,
        stream_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ChatHistoryEntry>> {
        let inner = self.lock()?;
        let matching: Vec<&ChatMessage> = inner
            .messages
            .iter()
            .filter(|m| stream_id.map_or(true, |room| m.stream_id.as_deref() == Some(room)))
            .collect();
        let skip = matching.len().saturating_sub(limit);
        Ok(matching
            .into_iter()
            .skip(skip)
            .map(|m| ChatHistoryEntry {
                username: inner
                    .users
                    .get(&m.user_id)
                    .map(|u| u.name.clone())
                    .unwrap_or_default(),
                message: m.clone(),
            })
            .collect())
    }
}
