//! Economy engine: gifts, checkout, completion, redemption, the gift panel
//! and subscriptions.
//!
//! Every balance change here is a single [`Store`] call, so the check and
//! the mutation can't be separated by a concurrent request. Functions only
//! read beforehand to validate input and to build the response.

use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use unistream_core::leveling::resolve_threshold;
use unistream_core::{
    gift_xp, CoinPack, EconomyError, Gift, GiftId, LevelChange, NewGift, PanelGift, Result,
    Transaction, TransactionId, User, UserId, CHAT_MESSAGE_XP, MIN_LEVEL_THRESHOLD,
    REDEEM_COINS_GRANTED, REDEEM_POINTS_COST,
};
use unistream_store::{Completion, Store};

/// Goodbye message shown when the streamer never set one.
pub const DEFAULT_GOODBYE_MESSAGE: &str = "See you soon!";

/// Longest goodbye message a streamer may set, in characters.
pub const MAX_GOODBYE_MESSAGE_CHARS: usize = 280;

/// Emoji used for custom gifts created without one.
pub const DEFAULT_GIFT_EMOJI: &str = "🎁";

// ============================================================================
// Lookups
// ============================================================================

pub(crate) async fn require_user(store: &dyn Store, id: &UserId) -> Result<User> {
    store
        .get_user(id)
        .await?
        .ok_or_else(|| EconomyError::UserNotFound(id.to_string()))
}

pub(crate) async fn require_streamer(store: &dyn Store, id: &UserId) -> Result<User> {
    let user = require_user(store, id).await?;
    if !user.is_streamer() {
        return Err(EconomyError::Forbidden(
            "only streamers can do this".into(),
        ));
    }
    Ok(user)
}

async fn require_gift(store: &dyn Store, id: GiftId) -> Result<Gift> {
    store
        .get_gift(id)
        .await?
        .ok_or_else(|| EconomyError::not_found("gift", id))
}

// ============================================================================
// Gifts
// ============================================================================

/// Result of a gift send.
#[derive(Debug, Clone, Serialize)]
pub struct GiftOutcome {
    /// The receipt written to the ledger.
    pub transaction_id: TransactionId,
    /// Sender's coins after the debit.
    pub coins: i64,
    /// Sender's points after the credit.
    pub points: i64,
    /// XP earned by this gift.
    pub xp_gained: i64,
    /// Whether a level boundary was crossed on the streamer's scale.
    pub level_up: bool,
    /// Sender's level on the streamer's scale.
    pub new_level: i64,
    /// Human-readable confirmation.
    pub message: String,
    /// The gift that was sent.
    #[serde(skip)]
    pub gift: Gift,
    /// Sender display name, for the alert.
    #[serde(skip)]
    pub sender_name: String,
}

/// Send `gift_id` from `sender_id` to `streamer_id`.
pub async fn send_gift(
    store: &dyn Store,
    sender_id: &UserId,
    streamer_id: &UserId,
    gift_id: GiftId,
) -> Result<GiftOutcome> {
    let gift = require_gift(store, gift_id).await?;
    let sender = require_user(store, sender_id).await?;
    let streamer = require_user(store, streamer_id).await?;

    let xp = gift_xp(gift.cost);
    let threshold = resolve_threshold(Some(streamer.level_threshold));

    let receipt = Transaction::gift(sender.id, streamer.id, gift.cost, xp);
    let updated = store.apply_gift(&receipt).await?;

    let change = LevelChange::from_gain(updated.points - xp, xp, threshold);

    tracing::info!(
        sender_id = %sender.id,
        streamer_id = %streamer.id,
        gift_id = %gift.id,
        cost = gift.cost,
        xp = xp,
        level_up = change.leveled_up(),
        "Gift sent"
    );

    Ok(GiftOutcome {
        transaction_id: receipt.id,
        coins: updated.coins,
        points: updated.points,
        xp_gained: xp,
        level_up: change.leveled_up(),
        new_level: change.after,
        message: format!("You sent {}! You earned {xp} XP.", gift.name),
        gift,
        sender_name: updated.name,
    })
}

/// Input for a streamer-owned gift.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomGiftRequest {
    /// Display name.
    pub name: String,
    /// Price in coins.
    pub cost: i64,
    /// Emoji; defaults to a wrapped present.
    #[serde(default)]
    pub emoji: Option<String>,
}

/// Create a gift owned by `streamer_id`. It starts active on their panel.
pub async fn create_custom_gift(
    store: &dyn Store,
    streamer_id: &UserId,
    request: CustomGiftRequest,
) -> Result<Gift> {
    let streamer = require_streamer(store, streamer_id).await?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(EconomyError::InvalidInput("gift name is required".into()));
    }
    if request.cost < 1 {
        return Err(EconomyError::InvalidInput(
            "gift cost must be at least 1 coin".into(),
        ));
    }
    let emoji = request
        .emoji
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(DEFAULT_GIFT_EMOJI);

    let gift = store
        .create_gift(&NewGift {
            name: name.to_string(),
            cost: request.cost,
            emoji: emoji.to_string(),
            owner_id: Some(streamer.id),
        })
        .await?;

    tracing::info!(streamer_id = %streamer.id, gift_id = %gift.id, "Custom gift created");
    Ok(gift)
}

/// Delete a custom gift. Only its owner may do so.
pub async fn delete_gift(store: &dyn Store, user_id: &UserId, gift_id: GiftId) -> Result<()> {
    let gift = require_gift(store, gift_id).await?;
    if gift.is_default() {
        return Err(EconomyError::Forbidden(
            "platform gifts cannot be deleted".into(),
        ));
    }
    if gift.owner_id.as_ref() != Some(user_id) {
        return Err(EconomyError::Forbidden("you do not own this gift".into()));
    }
    store.delete_gift(gift_id).await?;
    tracing::info!(user_id = %user_id, gift_id = %gift_id, "Custom gift deleted");
    Ok(())
}

/// Flip a custom gift on or off for the streamer's channel. Returns the new
/// active flag.
pub async fn toggle_gift_activation(
    store: &dyn Store,
    streamer_id: &UserId,
    gift_id: GiftId,
) -> Result<bool> {
    let streamer = require_streamer(store, streamer_id).await?;
    let gift = require_gift(store, gift_id).await?;
    if gift.is_default() {
        return Err(EconomyError::InvalidState(
            "platform gifts are always active".into(),
        ));
    }
    if gift.owner_id != Some(streamer.id) {
        return Err(EconomyError::Forbidden("you do not own this gift".into()));
    }

    let active = store.toggle_gift_activation(&streamer.id, gift_id).await?;
    tracing::debug!(streamer_id = %streamer.id, gift_id = %gift_id, active, "Gift toggled");
    Ok(active)
}

/// The streamer's configuration panel: defaults plus their own gifts.
pub async fn streamer_gift_panel(store: &dyn Store, streamer_id: &UserId) -> Result<Vec<PanelGift>> {
    let streamer = require_streamer(store, streamer_id).await?;
    Ok(store.list_panel_gifts(&streamer.id).await?)
}

/// Gifts fans can currently send on `streamer_id`'s channel.
pub async fn channel_gifts(store: &dyn Store, streamer_id: &UserId) -> Result<Vec<Gift>> {
    let streamer = require_user(store, streamer_id).await?;
    Ok(store
        .list_panel_gifts(&streamer.id)
        .await?
        .into_iter()
        .filter(|p| p.is_active)
        .map(|p| p.gift)
        .collect())
}

// ============================================================================
// Checkout
// ============================================================================

/// What a checkout pays for.
#[derive(Debug, Clone, Deserialize)]
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

/// Open a pending checkout. Amounts come from the catalog, never the client.
pub async fn create_checkout(
    store: &dyn Store,
    user_id: &UserId,
    request: &CheckoutRequest,
) -> Result<Transaction> {
    let user = require_user(store, user_id).await?;

    let transaction = match request {
        CheckoutRequest::Coins { pack_id } => {
            let pack: CoinPack = store
                .get_coin_pack(*pack_id)
                .await?
                .ok_or_else(|| EconomyError::not_found("coin pack", pack_id))?;
            if !pack.is_active {
                return Err(EconomyError::InvalidInput(format!(
                    "coin pack {pack_id} is not on sale"
                )));
            }
            Transaction::pending_purchase(user.id, pack.coins, pack.price_cents, pack.points_awarded)
        }
        CheckoutRequest::Subscription { streamer_id } => {
            if *streamer_id == user.id {
                return Err(EconomyError::Conflict(
                    "you cannot subscribe to yourself".into(),
                ));
            }
            let streamer = require_user(store, streamer_id).await?;
            if !streamer.is_streamer() {
                return Err(EconomyError::InvalidInput(
                    "subscriptions are only offered by streamers".into(),
                ));
            }
            if store.get_subscription(&user.id, &streamer.id).await?.is_some() {
                return Err(EconomyError::Conflict(
                    "already subscribed to this streamer".into(),
                ));
            }
            Transaction::pending_subscription(user.id, streamer.id)
        }
    };

    store.create_transaction(&transaction).await?;

    tracing::info!(
        user_id = %user.id,
        transaction_id = %transaction.id,
        kind = %transaction.kind,
        price_cents = transaction.price_cents,
        "Checkout created"
    );

    Ok(transaction)
}

/// Apply a paid checkout. Completing twice is a no-op that reports
/// `already_completed`.
pub async fn complete_transaction(store: &dyn Store, id: &TransactionId) -> Result<Completion> {
    let completion = store.complete_transaction(id).await?;

    if completion.already_completed {
        tracing::info!(transaction_id = %id, "Transaction already completed");
    } else {
        tracing::info!(
            transaction_id = %id,
            user_id = %completion.user.id,
            kind = %completion.transaction.kind,
            coins = completion.transaction.coins_on_completion(),
            points = completion.transaction.points,
            subscription_created = completion.subscription_created,
            "Transaction completed"
        );
    }

    Ok(completion)
}

/// Exchange points for coins at the fixed rate.
pub async fn redeem_points(store: &dyn Store, user_id: &UserId) -> Result<User> {
    let user = store
        .redeem_points(user_id, REDEEM_POINTS_COST, REDEEM_COINS_GRANTED)
        .await?;
    tracing::info!(
        user_id = %user_id,
        points_spent = REDEEM_POINTS_COST,
        coins_granted = REDEEM_COINS_GRANTED,
        "Points redeemed"
    );
    Ok(user)
}

// ============================================================================
// Chat XP
// ============================================================================

/// Per-user cooldown between XP-earning chat messages.
#[derive(Debug)]
pub struct ChatXpLimiter {
    cooldown: Duration,
    last_award: DashMap<UserId, Instant>,
}

impl ChatXpLimiter {
    /// Create a limiter. A zero cooldown awards every message.
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_award: DashMap::new(),
        }
    }

    /// Claim an award slot for `user_id`. Returns `false` while cooling down.
    pub fn try_acquire(&self, user_id: &UserId) -> bool {
        let now = Instant::now();
        match self.last_award.entry(*user_id) {
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
            Entry::Occupied(mut slot) => {
                if now.duration_since(*slot.get()) < self.cooldown {
                    return false;
                }
                slot.insert(now);
                true
            }
        }
    }
}

/// Credit chat XP unless the user is cooling down. Returns the new point
/// balance when XP was awarded.
pub async fn award_chat_xp(
    store: &dyn Store,
    limiter: &ChatXpLimiter,
    user_id: &UserId,
) -> Result<Option<i64>> {
    if !limiter.try_acquire(user_id) {
        return Ok(None);
    }
    let points = store.add_points(user_id, CHAT_MESSAGE_XP).await?;
    Ok(Some(points))
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Whether a fan is subscribed to a channel.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStatus {
    /// The channel.
    pub streamer_id: UserId,
    /// Whether a subscription exists.
    pub subscribed: bool,
    /// When it started.
    pub since: Option<chrono::DateTime<Utc>>,
    /// Whole days subscribed, rounded up.
    pub days_subscribed: i64,
}

/// Look up the subscription of `subscriber` to `streamer_id`.
pub async fn subscription_status(
    store: &dyn Store,
    subscriber: &UserId,
    streamer_id: &UserId,
) -> Result<SubscriptionStatus> {
    let sub = store.get_subscription(subscriber, streamer_id).await?;
    let now = Utc::now();
    Ok(SubscriptionStatus {
        streamer_id: *streamer_id,
        subscribed: sub.is_some(),
        since: sub.as_ref().map(|s| s.created_at),
        days_subscribed: sub.map_or(0, |s| s.days_subscribed(now)),
    })
}

/// Result of cancelling a subscription.
#[derive(Debug, Clone, Serialize)]
pub struct Unsubscribed {
    /// Whole days the subscription lasted, rounded up.
    pub days_subscribed: i64,
    /// The streamer's farewell.
    pub goodbye_message: String,
}

/// Cancel a subscription.
pub async fn unsubscribe(
    store: &dyn Store,
    subscriber: &UserId,
    streamer_id: &UserId,
) -> Result<Unsubscribed> {
    let streamer = require_user(store, streamer_id).await?;
    let removed = store
        .delete_subscription(subscriber, &streamer.id)
        .await?
        .ok_or_else(|| EconomyError::not_found("subscription", streamer_id))?;

    let days = removed.days_subscribed(Utc::now());
    tracing::info!(
        subscriber_id = %subscriber,
        streamer_id = %streamer.id,
        days_subscribed = days,
        "Subscription cancelled"
    );

    Ok(Unsubscribed {
        days_subscribed: days,
        goodbye_message: streamer
            .goodbye_message
            .unwrap_or_else(|| DEFAULT_GOODBYE_MESSAGE.to_string()),
    })
}

// ============================================================================
// Streamer Settings
// ============================================================================

/// Change the points-per-level threshold of a streamer's community.
pub async fn update_threshold(store: &dyn Store, streamer_id: &UserId, threshold: i64) -> Result<User> {
    let streamer = require_streamer(store, streamer_id).await?;
    if threshold < MIN_LEVEL_THRESHOLD {
        return Err(EconomyError::InvalidInput(format!(
            "level threshold must be at least {MIN_LEVEL_THRESHOLD}"
        )));
    }
    let user = store.set_level_threshold(&streamer.id, threshold).await?;
    tracing::info!(
        streamer_id = %streamer.id,
        threshold,
        "Level threshold updated"
    );
    Ok(user)
}

/// Set or clear the farewell shown to cancelling subscribers.
pub async fn set_goodbye_message(
    store: &dyn Store,
    streamer_id: &UserId,
    message: Option<&str>,
) -> Result<User> {
    let streamer = require_streamer(store, streamer_id).await?;
    let message = message.map(str::trim).filter(|m| !m.is_empty());
    if message.is_some_and(|m| m.chars().count() > MAX_GOODBYE_MESSAGE_CHARS) {
        return Err(EconomyError::InvalidInput(format!(
            "goodbye message must be at most {MAX_GOODBYE_MESSAGE_CHARS} characters"
        )));
    }
    Ok(store.set_goodbye_message(&streamer.id, message).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use unistream_core::{Role, TransactionKind, TransactionStatus};
    use unistream_store::MemoryStore;

    const FUEGO: GiftId = GiftId(4); // 50 coins
    const ROSA: GiftId = GiftId(1); // 5 coins

    async fn user_with(store: &MemoryStore, role: Role, coins: i64, points: i64) -> User {
        let user = User::new(
            format!("{}@ulima.edu.pe", UserId::generate()),
            "Tester",
            "hash",
            role,
        );
        store.create_user(&user).await.unwrap();
        store.set_balances(&user.id, coins, points).unwrap();
        store.get_user(&user.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn gift_debits_sender_and_reports_level_up() {
        let store = MemoryStore::with_defaults();
        let fan = user_with(&store, Role::Fan, 50, 0).await;
        let streamer = user_with(&store, Role::Streamer, 0, 0).await;

        let outcome = send_gift(&store, &fan.id, &streamer.id, FUEGO).await.unwrap();
        assert_eq!(outcome.coins, 0);
        assert_eq!(outcome.points, 500);
        assert_eq!(outcome.xp_gained, 500);
        assert!(outcome.level_up);
        assert_eq!(outcome.new_level, 2);
        assert_eq!(outcome.message, "You sent Fuego! You earned 500 XP.");

        let receipt = store
            .get_transaction(&outcome.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receipt.kind, TransactionKind::Gift);
        assert_eq!(receipt.status, TransactionStatus::Completed);
        assert_eq!(receipt.target_streamer_id, Some(streamer.id));
    }

    #[tokio::test]
    async fn gift_without_coins_is_rejected_without_side_effects() {
        let store = MemoryStore::with_defaults();
        let fan = user_with(&store, Role::Fan, 49, 0).await;
        let streamer = user_with(&store, Role::Streamer, 0, 0).await;

        let err = send_gift(&store, &fan.id, &streamer.id, FUEGO).await.unwrap_err();
        assert!(matches!(
            err,
            EconomyError::InsufficientFunds {
                balance: 49,
                required: 50
            }
        ));
        let after = store.get_user(&fan.id).await.unwrap().unwrap();
        assert_eq!((after.coins, after.points), (49, 0));
        assert!(store
            .list_transactions_by_user(&fan.id, 10, 0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn level_up_uses_the_streamers_threshold() {
        let store = MemoryStore::with_defaults();
        let fan = user_with(&store, Role::Fan, 5, 0).await;
        let streamer = user_with(&store, Role::Streamer, 0, 0).await;
        update_threshold(&store, &streamer.id, 50).await.unwrap();

        let outcome = send_gift(&store, &fan.id, &streamer.id, ROSA).await.unwrap();
        assert_eq!(outcome.xp_gained, 50);
        assert!(outcome.level_up);
        assert_eq!(outcome.new_level, 2);
    }

    #[tokio::test]
    async fn gift_to_missing_streamer_is_not_found() {
        let store = MemoryStore::with_defaults();
        let fan = user_with(&store, Role::Fan, 50, 0).await;
        let err = send_gift(&store, &fan.id, &UserId::generate(), FUEGO)
            .await
            .unwrap_err();
        assert!(matches!(err, EconomyError::UserNotFound(_)));

        let err = send_gift(&store, &fan.id, &fan.id, GiftId(999)).await.unwrap_err();
        assert!(matches!(err, EconomyError::NotFound { entity: "gift", .. }));
    }

    #[tokio::test]
    async fn concurrent_gifts_apply_once() {
        let store = Arc::new(MemoryStore::with_defaults());
        let fan = user_with(&store, Role::Fan, 50, 0).await;
        let streamer = user_with(&store, Role::Streamer, 0, 0).await;

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            let (fan, streamer) = (fan.id, streamer.id);
            handles.push(tokio::spawn(async move {
                send_gift(store.as_ref(), &fan, &streamer, FUEGO).await
            }));
        }
        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.get_user(&fan.id).await.unwrap().unwrap().coins, 0);
    }

    #[tokio::test]
    async fn coin_checkout_takes_amounts_from_the_catalog() {
        let store = MemoryStore::with_defaults();
        let fan = user_with(&store, Role::Fan, 0, 0).await;

        let tx = create_checkout(&store, &fan.id, &CheckoutRequest::Coins { pack_id: 2 })
            .await
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!((tx.amount, tx.price_cents, tx.points), (550, 2500, 60));

        let done = complete_transaction(&store, &tx.id).await.unwrap();
        assert_eq!(done.user.coins, 550);
        assert_eq!(done.user.points, 60);

        let again = complete_transaction(&store, &tx.id).await.unwrap();
        assert!(again.already_completed);
        assert_eq!(again.user.coins, 550);
    }

    #[tokio::test]
    async fn unknown_pack_is_not_found() {
        let store = MemoryStore::with_defaults();
        let fan = user_with(&store, Role::Fan, 0, 0).await;
        let err = create_checkout(&store, &fan.id, &CheckoutRequest::Coins { pack_id: 42 })
            .await
            .unwrap_err();
        assert!(matches!(err, EconomyError::NotFound { entity: "coin pack", .. }));
    }

    #[tokio::test]
    async fn subscription_checkout_rules() {
        let store = MemoryStore::with_defaults();
        let fan = user_with(&store, Role::Fan, 0, 0).await;
        let streamer = user_with(&store, Role::Streamer, 0, 0).await;

        let err = create_checkout(
            &store,
            &streamer.id,
            &CheckoutRequest::Subscription {
                streamer_id: streamer.id,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EconomyError::Conflict(_)));

        let request = CheckoutRequest::Subscription {
            streamer_id: streamer.id,
        };
        let tx = create_checkout(&store, &fan.id, &request).await.unwrap();
        assert_eq!(tx.price_cents, 1500);
        let done = complete_transaction(&store, &tx.id).await.unwrap();
        assert!(done.subscription_created);
        assert_eq!(done.user.points, 50);
        assert_eq!(done.user.coins, 0);

        let err = create_checkout(&store, &fan.id, &request).await.unwrap_err();
        assert!(matches!(err, EconomyError::Conflict(_)));
    }

    #[tokio::test]
    async fn completing_unknown_transaction_is_not_found() {
        let store = MemoryStore::with_defaults();
        let err = complete_transaction(&store, &TransactionId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, EconomyError::NotFound { entity: "transaction", .. }));
    }

    #[tokio::test]
    async fn redeem_exchanges_points_for_coins() {
        let store = MemoryStore::with_defaults();
        let fan = user_with(&store, Role::Fan, 0, 120).await;

        let user = redeem_points(&store, &fan.id).await.unwrap();
        assert_eq!((user.coins, user.points), (10, 20));

        let err = redeem_points(&store, &fan.id).await.unwrap_err();
        assert!(matches!(
            err,
            EconomyError::InsufficientPoints {
                balance: 20,
                required: 100
            }
        ));
    }

    #[tokio::test]
    async fn custom_gift_lifecycle() {
        let store = MemoryStore::with_defaults();
        let streamer = user_with(&store, Role::Streamer, 0, 0).await;
        let fan = user_with(&store, Role::Fan, 0, 0).await;

        let err = create_custom_gift(
            &store,
            &fan.id,
            CustomGiftRequest {
                name: "Nope".into(),
                cost: 10,
                emoji: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EconomyError::Forbidden(_)));

        let err = create_custom_gift(
            &store,
            &streamer.id,
            CustomGiftRequest {
                name: "Gratis".into(),
                cost: 0,
                emoji: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EconomyError::InvalidInput(_)));

        let gift = create_custom_gift(
            &store,
            &streamer.id,
            CustomGiftRequest {
                name: " Tortuga ".into(),
                cost: 30,
                emoji: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(gift.name, "Tortuga");
        assert_eq!(gift.emoji, DEFAULT_GIFT_EMOJI);
        assert!(channel_gifts(&store, &streamer.id)
            .await
            .unwrap()
            .iter()
            .any(|g| g.id == gift.id));

        assert!(!toggle_gift_activation(&store, &streamer.id, gift.id).await.unwrap());
        assert!(!channel_gifts(&store, &streamer.id)
            .await
            .unwrap()
            .iter()
            .any(|g| g.id == gift.id));
        assert!(toggle_gift_activation(&store, &streamer.id, gift.id).await.unwrap());

        let err = delete_gift(&store, &fan.id, gift.id).await.unwrap_err();
        assert!(matches!(err, EconomyError::Forbidden(_)));
        delete_gift(&store, &streamer.id, gift.id).await.unwrap();
        assert!(store.get_gift(gift.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn default_gifts_cannot_be_toggled_or_deleted() {
        let store = MemoryStore::with_defaults();
        let streamer = user_with(&store, Role::Streamer, 0, 0).await;

        let err = toggle_gift_activation(&store, &streamer.id, ROSA).await.unwrap_err();
        assert!(matches!(err, EconomyError::InvalidState(_)));
        let err = delete_gift(&store, &streamer.id, ROSA).await.unwrap_err();
        assert!(matches!(err, EconomyError::Forbidden(_)));

        let panel = streamer_gift_panel(&store, &streamer.id).await.unwrap();
        assert_eq!(panel.len(), 10);
        assert!(panel.iter().all(|p| p.is_active && !p.is_custom));
    }

    #[tokio::test]
    async fn other_streamers_gift_cannot_be_toggled() {
        let store = MemoryStore::with_defaults();
        let owner = user_with(&store, Role::Streamer, 0, 0).await;
        let other = user_with(&store, Role::Streamer, 0, 0).await;
        let gift = create_custom_gift(
            &store,
            &owner.id,
            CustomGiftRequest {
                name: "Llama".into(),
                cost: 15,
                emoji: Some("🦙".into()),
            },
        )
        .await
        .unwrap();

        let err = toggle_gift_activation(&store, &other.id, gift.id).await.unwrap_err();
        assert!(matches!(err, EconomyError::Forbidden(_)));
    }

    #[tokio::test]
    async fn chat_xp_is_throttled() {
        let store = MemoryStore::with_defaults();
        let fan = user_with(&store, Role::Fan, 0, 0).await;
        let limiter = ChatXpLimiter::new(Duration::from_secs(60));

        assert_eq!(award_chat_xp(&store, &limiter, &fan.id).await.unwrap(), Some(1));
        assert_eq!(award_chat_xp(&store, &limiter, &fan.id).await.unwrap(), None);
        assert_eq!(store.get_user(&fan.id).await.unwrap().unwrap().points, 1);
    }

    #[tokio::test]
    async fn zero_cooldown_awards_every_message() {
        let store = MemoryStore::with_defaults();
        let fan = user_with(&store, Role::Fan, 0, 0).await;
        let limiter = ChatXpLimiter::new(Duration::ZERO);
        for _ in 0..3 {
            award_chat_xp(&store, &limiter, &fan.id).await.unwrap();
        }
        assert_eq!(store.get_user(&fan.id).await.unwrap().unwrap().points, 3);
    }

    #[tokio::test]
    async fn unsubscribe_returns_goodbye() {
        let store = MemoryStore::with_defaults();
        let fan = user_with(&store, Role::Fan, 0, 0).await;
        let streamer = user_with(&store, Role::Streamer, 0, 0).await;

        let tx = create_checkout(
            &store,
            &fan.id,
            &CheckoutRequest::Subscription {
                streamer_id: streamer.id,
            },
        )
        .await
        .unwrap();
        complete_transaction(&store, &tx.id).await.unwrap();
        assert!(subscription_status(&store, &fan.id, &streamer.id).await.unwrap().subscribed);

        let bye = unsubscribe(&store, &fan.id, &streamer.id).await.unwrap();
        assert_eq!(bye.goodbye_message, DEFAULT_GOODBYE_MESSAGE);
        assert!(!subscription_status(&store, &fan.id, &streamer.id).await.unwrap().subscribed);

        let err = unsubscribe(&store, &fan.id, &streamer.id).await.unwrap_err();
        assert!(matches!(err, EconomyError::NotFound { entity: "subscription", .. }));
    }

    #[tokio::test]
    async fn custom_goodbye_message_is_used() {
        let store = MemoryStore::with_defaults();
        let fan = user_with(&store, Role::Fan, 0, 0).await;
        let streamer = user_with(&store, Role::Streamer, 0, 0).await;
        set_goodbye_message(&store, &streamer.id, Some("  Chau, vuelve pronto  "))
            .await
            .unwrap();

        let tx = Transaction::pending_subscription(fan.id, streamer.id);
        store.create_transaction(&tx).await.unwrap();
        complete_transaction(&store, &tx.id).await.unwrap();

        let bye = unsubscribe(&store, &fan.id, &streamer.id).await.unwrap();
        assert_eq!(bye.goodbye_message, "Chau, vuelve pronto");
    }

    #[tokio::test]
    async fn threshold_has_a_floor() {
        let store = MemoryStore::with_defaults();
        let streamer = user_with(&store, Role::Streamer, 0, 0).await;
        let fan = user_with(&store, Role::Fan, 0, 0).await;

        let err = update_threshold(&store, &streamer.id, 49).await.unwrap_err();
        assert!(matches!(err, EconomyError::InvalidInput(_)));
        let err = update_threshold(&store, &fan.id, 100).await.unwrap_err();
        assert!(matches!(err, EconomyError::Forbidden(_)));

        let user = update_threshold(&store, &streamer.id, 50).await.unwrap();
        assert_eq!(user.level_threshold, 50);
    }
}
