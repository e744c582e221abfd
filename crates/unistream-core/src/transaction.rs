//! Ledger transactions, subscriptions and the fixed exchange rates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{TransactionId, UserId};

// ============================================================================
// Rates
// ============================================================================

/// XP granted per coin spent on a gift.
pub const XP_PER_GIFT_COIN: i64 = 10;

/// Points consumed by one redemption.
pub const REDEEM_POINTS_COST: i64 = 100;

/// Coins granted by one redemption.
pub const REDEEM_COINS_GRANTED: i64 = 10;

/// XP granted per chat message.
pub const CHAT_MESSAGE_XP: i64 = 1;

/// Price of a channel subscription, in cents.
pub const SUBSCRIPTION_PRICE_CENTS: i64 = 1500;

/// XP granted when a subscription payment completes.
pub const SUBSCRIPTION_POINTS: i64 = 50;

/// XP earned by sending a gift that costs `cost` coins.
#[must_use]
pub const fn gift_xp(cost: i64) -> i64 {
    cost.saturating_mul(XP_PER_GIFT_COIN)
}

// ============================================================================
// Transactions
// ============================================================================

/// What a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Coins spent on a gift for a streamer.
    Gift,
    /// Coins bought through the payment gateway.
    Purchase,
    /// A paid channel subscription.
    Subscription,
}

impl TransactionKind {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gift => "GIFT",
            Self::Purchase => "PURCHASE",
            Self::Subscription => "SUBSCRIPTION",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GIFT" => Ok(Self::Gift),
            "PURCHASE" => Ok(Self::Purchase),
            "SUBSCRIPTION" => Ok(Self::Subscription),
            other => Err(format!("unknown transaction kind: {other}")),
        }
    }
}

/// Lifecycle of a ledger entry. `Completed` is terminal; an abandoned
/// checkout simply stays `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Awaiting the payment gateway.
    Pending,
    /// Applied to balances.
    Completed,
}

impl TransactionStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(format!("unknown transaction status: {other}")),
        }
    }
}

/// An immutable ledger record. Only `status` and `completed_at` ever change,
/// and only once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique id (ULID).
    pub id: TransactionId,
    /// The paying / sending user.
    pub user_id: UserId,
    /// What the entry records.
    pub kind: TransactionKind,
    /// Current status.
    pub status: TransactionStatus,
    /// Coins granted (purchase) or spent (gift).
    pub amount: i64,
    /// Real-money price in cents, zero for gifts.
    pub price_cents: i64,
    /// XP granted.
    pub points: i64,
    /// Streamer the entry is directed at.
    pub target_streamer_id: Option<UserId>,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
    /// When the entry reached `Completed`.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// A completed gift receipt.
    #[must_use]
    pub fn gift(sender: UserId, streamer: UserId, cost: i64, points: i64) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::generate(),
            user_id: sender,
            kind: TransactionKind::Gift,
            status: TransactionStatus::Completed,
            amount: cost,
            price_cents: 0,
            points,
            target_streamer_id: Some(streamer),
            created_at: now,
            completed_at: Some(now),
        }
    }

    /// A pending coin purchase awaiting the gateway.
    #[must_use]
    pub fn pending_purchase(user_id: UserId, coins: i64, price_cents: i64, points: i64) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            kind: TransactionKind::Purchase,
            status: TransactionStatus::Pending,
            amount: coins,
            price_cents,
            points,
            target_streamer_id: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// A pending subscription to `streamer` awaiting the gateway.
    #[must_use]
    pub fn pending_subscription(user_id: UserId, streamer: UserId) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            kind: TransactionKind::Subscription,
            status: TransactionStatus::Pending,
            amount: 1,
            price_cents: SUBSCRIPTION_PRICE_CENTS,
            points: SUBSCRIPTION_POINTS,
            target_streamer_id: Some(streamer),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Whether completion of this entry opens a subscription rather than
    /// crediting coins.
    #[must_use]
    pub fn grants_subscription(&self) -> bool {
        self.kind == TransactionKind::Subscription && self.target_streamer_id.is_some()
    }

    /// Coins credited when this entry completes.
    #[must_use]
    pub fn coins_on_completion(&self) -> i64 {
        if self.grants_subscription() {
            0
        } else {
            self.amount
        }
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

/// An active channel subscription. Deleting it is the unsubscribe action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// The subscribing fan.
    pub subscriber_id: UserId,
    /// The channel.
    pub streamer_id: UserId,
    /// When the subscription started.
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Start a subscription now.
    #[must_use]
    pub fn new(subscriber_id: UserId, streamer_id: UserId) -> Self {
        Self {
            subscriber_id,
            streamer_id,
            created_at: Utc::now(),
        }
    }

    /// Whole days subscribed at `now`, rounded up (minimum 1 once any time has passed).
    #[must_use]
    pub fn days_subscribed(&self, now: DateTime<Utc>) -> i64 {
        let millis = (now - self.created_at).num_milliseconds().abs();
        let day = 24 * 60 * 60 * 1000;
        (millis + day - 1) / day
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn gift_receipt_is_completed() {
        let tx = Transaction::gift(UserId::generate(), UserId::generate(), 50, gift_xp(50));
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.kind, TransactionKind::Gift);
        assert_eq!(tx.points, 500);
        assert!(tx.completed_at.is_some());
    }

    #[test]
    fn purchase_credits_coins_on_completion() {
        let tx = Transaction::pending_purchase(UserId::generate(), 550, 2500, 60);
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert!(!tx.grants_subscription());
        assert_eq!(tx.coins_on_completion(), 550);
    }

    #[test]
    fn subscription_credits_no_coins() {
        let tx = Transaction::pending_subscription(UserId::generate(), UserId::generate());
        assert!(tx.grants_subscription());
        assert_eq!(tx.coins_on_completion(), 0);
        assert_eq!(tx.points, SUBSCRIPTION_POINTS);
        assert_eq!(tx.price_cents, 1500);
    }

    #[test]
    fn kind_and_status_round_trip_storage_strings() {
        for kind in [TransactionKind::Gift, TransactionKind::Purchase, TransactionKind::Subscription] {
            assert_eq!(kind.as_str().parse::<TransactionKind>().unwrap(), kind);
        }
        assert_eq!("PENDING".parse::<TransactionStatus>().unwrap(), TransactionStatus::Pending);
        assert!("CANCELLED".parse::<TransactionStatus>().is_err());
        assert_eq!(serde_json::to_string(&TransactionKind::Gift).unwrap(), "\"GIFT\"");
    }

    #[test]
    fn days_subscribed_rounds_up() {
        let mut sub = Subscription::new(UserId::generate(), UserId::generate());
        let now = sub.created_at;
        assert_eq!(sub.days_subscribed(now), 0);
        assert_eq!(sub.days_subscribed(now + Duration::minutes(5)), 1);
        sub.created_at = now - Duration::days(3) - Duration::hours(1);
        assert_eq!(sub.days_subscribed(now), 4);
    }
}
