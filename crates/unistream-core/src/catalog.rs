//! Shop catalog: gifts and coin packs.

use serde::{Deserialize, Serialize};

use crate::{GiftId, UserId};

/// A gift that fans can send during a stream.
///
/// Platform gifts have no owner and are offered on every streamer's panel.
/// Custom gifts belong to one streamer and only show up while activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gift {
    /// Catalog id.
    pub id: GiftId,
    /// Display name.
    pub name: String,
    /// Price in coins.
    pub cost: i64,
    /// Emoji shown in alerts.
    pub emoji: String,
    /// Owning streamer; `None` for platform defaults.
    pub owner_id: Option<UserId>,
}

impl Gift {
    /// Whether this is a platform default gift.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.owner_id.is_none()
    }

    /// Whether the gift shows as active on `streamer`'s panel, given whether
    /// an activation row exists for it.
    ///
    /// Defaults are always active and ignore the activation table; custom
    /// gifts are active only while a row exists.
    #[must_use]
    pub fn is_active_for(&self, has_activation_row: bool) -> bool {
        self.is_default() || has_activation_row
    }
}

/// Input for creating a gift.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewGift {
    /// Display name.
    pub name: String,
    /// Price in coins.
    pub cost: i64,
    /// Emoji shown in alerts.
    pub emoji: String,
    /// Owning streamer, `None` for platform seeds.
    pub owner_id: Option<UserId>,
}

/// A gift as seen from one streamer's configuration panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelGift {
    /// The catalog entry.
    #[serde(flatten)]
    pub gift: Gift,
    /// Whether fans can currently send it on this channel.
    pub is_active: bool,
    /// Whether the streamer owns it.
    pub is_custom: bool,
}

/// A purchasable bundle of coins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinPack {
    /// Catalog id.
    pub id: i64,
    /// Coins granted on completion.
    pub coins: i64,
    /// Price charged by the gateway, in cents.
    pub price_cents: i64,
    /// Bonus XP granted on completion.
    pub points_awarded: i64,
    /// Whether the pack is on sale.
    pub is_active: bool,
}

/// Platform gifts seeded into a fresh store: `(name, cost, emoji)`.
pub const DEFAULT_GIFTS: &[(&str, i64, &str)] = &[
    ("Rosa", 5, "🌹"),
    ("Aplauso", 10, "👏"),
    ("Corazón", 25, "❤️"),
    ("Fuego", 50, "🔥"),
    ("ULIMA GOAT", 100, "🐐"),
    ("Diamante", 250, "💎"),
    ("Cohete", 500, "🚀"),
    ("Trofeo", 750, "🏆"),
    ("Castillo", 1000, "🏰"),
    ("León", 2500, "🦁"),
];

/// Coin packs seeded into a fresh store: `(coins, price_cents, points)`.
pub const DEFAULT_COIN_PACKS: &[(i64, i64, i64)] = &[(100, 500, 10), (550, 2500, 60), (1200, 5000, 150)];

/// The default gift list as insertable records.
#[must_use]
pub fn default_gifts() -> Vec<NewGift> {
    DEFAULT_GIFTS
        .iter()
        .map(|(name, cost, emoji)| NewGift {
            name: (*name).to_string(),
            cost: *cost,
            emoji: (*emoji).to_string(),
            owner_id: None,
        })
        .collect()
}

/// The default coin packs with sequential ids starting at 1.
#[must_use]
pub fn default_coin_packs() -> Vec<CoinPack> {
    DEFAULT_COIN_PACKS
        .iter()
        .zip(1..)
        .map(|((coins, price_cents, points_awarded), id)| CoinPack {
            id,
            coins: *coins,
            price_cents: *price_cents,
            points_awarded: *points_awarded,
            is_active: true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gift(owner_id: Option<UserId>) -> Gift {
        Gift {
            id: GiftId(1),
            name: "Fuego".into(),
            cost: 50,
            emoji: "🔥".into(),
            owner_id,
        }
    }

    #[test]
    fn default_gift_is_active_without_a_row() {
        let g = gift(None);
        assert!(g.is_default());
        assert!(g.is_active_for(false));
        assert!(g.is_active_for(true));
    }

    #[test]
    fn custom_gift_needs_a_row() {
        let g = gift(Some(UserId::generate()));
        assert!(!g.is_default());
        assert!(!g.is_active_for(false));
        assert!(g.is_active_for(true));
    }

    #[test]
    fn seeds_are_sorted_by_cost() {
        let gifts = default_gifts();
        assert_eq!(gifts.len(), 10);
        assert!(gifts.windows(2).all(|w| w[0].cost < w[1].cost));
        assert!(gifts.iter().all(|g| g.owner_id.is_none()));
    }

    #[test]
    fn coin_packs_get_sequential_ids() {
        let packs = default_coin_packs();
        assert_eq!(packs.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(packs[1].coins, 550);
        assert_eq!(packs[1].points_awarded, 60);
    }
}
