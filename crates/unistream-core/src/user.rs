//! User accounts.
//!
//! A single row per user carries both virtual balances and the live-session
//! checkpoint, so every economy or session mutation touches exactly one user
//! record plus its ledger entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::leveling::{self, DEFAULT_LEVEL_THRESHOLD};
use crate::UserId;

/// Coins granted to every account at registration.
pub const STARTING_COINS: i64 = 100;

/// Role of an account on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A viewer who buys coins and sends gifts.
    #[default]
    Fan,
    /// A broadcaster who goes live and receives gifts.
    Streamer,
}

impl Role {
    /// Storage representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fan => "fan",
            Self::Streamer => "streamer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fan" => Ok(Self::Fan),
            "streamer" => Ok(Self::Streamer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// The user ID.
    pub id: UserId,

    /// Login email, unique across accounts.
    pub email: String,

    /// Display name.
    pub name: String,

    /// Argon2 PHC string. Never sent to clients.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Fan or streamer.
    pub role: Role,

    /// Whether the owner confirmed the account email.
    pub is_verified: bool,

    /// Pending email confirmation token. Never sent to clients.
    #[serde(skip_serializing, default)]
    pub verification_token: Option<String>,

    /// Free-form profile bio.
    pub description: Option<String>,

    /// Spendable coin balance.
    pub coins: i64,

    /// Accumulated XP.
    pub points: i64,

    /// Points per level that this streamer demands from their community.
    pub level_threshold: i64,

    /// Whether a broadcast is currently running.
    pub is_live: bool,

    /// Durable start checkpoint of the running broadcast.
    pub live_started_at: Option<DateTime<Utc>>,

    /// Broadcast hours accumulated across all finished sessions.
    pub total_live_hours: f64,

    /// Title of the running broadcast.
    pub stream_title: Option<String>,

    /// Category of the running broadcast.
    pub stream_category: Option<String>,

    /// Message shown to subscribers when they cancel.
    pub goodbye_message: Option<String>,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new, unverified account with empty balances.
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::generate(),
            email: email.into(),
            name: name.into(),
            password_hash: password_hash.into(),
            role,
            is_verified: false,
            verification_token: None,
            description: None,
            coins: 0,
            points: 0,
            level_threshold: DEFAULT_LEVEL_THRESHOLD,
            is_live: false,
            live_started_at: None,
            total_live_hours: 0.0,
            stream_title: None,
            stream_category: None,
            goodbye_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Account awaiting email confirmation with `token`, holding the
    /// registration coin grant.
    #[must_use]
    pub fn registered(mut self, token: impl Into<String>) -> Self {
        self.coins = STARTING_COINS;
        self.verification_token = Some(token.into());
        self
    }

    /// Whether this account can broadcast.
    #[must_use]
    pub fn is_streamer(&self) -> bool {
        self.role == Role::Streamer
    }

    /// Check if the account can pay `cost` coins.
    #[must_use]
    pub fn has_sufficient_coins(&self, cost: i64) -> bool {
        self.coins >= cost
    }

    /// Level of this account graded against its own threshold.
    #[must_use]
    pub fn level(&self) -> i64 {
        leveling::level(self.points, self.level_threshold)
    }

    /// Broadcasting level derived from accumulated live hours.
    #[must_use]
    pub fn streamer_level(&self) -> i64 {
        leveling::streamer_level(self.total_live_hours)
    }
}

/// Profile fields a user may edit about themselves.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New bio.
    pub description: Option<String>,
    /// Switch between fan and streamer.
    pub role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_starts_empty() {
        let user = User::new("ana@ulima.edu.pe", "Ana", "hash", Role::Fan);
        assert_eq!(user.coins, 0);
        assert_eq!(user.points, 0);
        assert_eq!(user.level_threshold, 500);
        assert!(!user.is_live);
        assert!(!user.is_verified);
        assert!(user.live_started_at.is_none());
        assert_eq!(user.level(), 1);
        assert_eq!(user.streamer_level(), 1);
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let user = User::new("ana@ulima.edu.pe", "Ana", "secret-hash", Role::Fan);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "fan");
    }

    #[test]
    fn registration_grants_starting_coins_and_hides_token() {
        let user = User::new("ana@ulima.edu.pe", "Ana", "hash", Role::Fan).registered("tok");
        assert_eq!(user.coins, STARTING_COINS);
        assert_eq!(user.verification_token.as_deref(), Some("tok"));
        assert!(!user.is_verified);

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("verification_token").is_none());
        assert_eq!(json["is_verified"], false);
    }

    #[test]
    fn sufficient_coins() {
        let mut user = User::new("a@b.c", "A", "h", Role::Fan);
        user.coins = 50;
        assert!(user.has_sufficient_coins(50));
        assert!(!user.has_sufficient_coins(51));
    }

    #[test]
    fn role_parses_from_storage() {
        assert_eq!("streamer".parse::<Role>().unwrap(), Role::Streamer);
        assert_eq!(Role::Fan.as_str(), "fan");
        assert!("admin".parse::<Role>().is_err());
    }
}
