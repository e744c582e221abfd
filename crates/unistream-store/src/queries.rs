//! SQL statements for the PostgreSQL backend.
//!
//! The DDL lives in `migrations/`. Balance mutations are written as
//! conditional updates so the check and the write are one statement.

// ============================================================================
// Users
// ============================================================================

/// Insert a user.
pub const INSERT_USER: &str = r"
INSERT INTO users (
    id, email, name, password_hash, role, description, coins, points,
    level_threshold, is_live, live_started_at, total_live_hours,
    stream_title, stream_category, goodbye_message, created_at, updated_at,
    is_verified, verification_token
)
VALUES (
    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
    $18, $19
)
";

/// Fetch a user by id.
pub const GET_USER: &str = "SELECT * FROM users WHERE id = $1";

/// Fetch a user by email.
pub const FIND_USER_BY_EMAIL: &str = "SELECT * FROM users WHERE email = $1";

/// Consume a verification token.
pub const VERIFY_USER: &str = r"
UPDATE users
SET is_verified = TRUE, verification_token = NULL, updated_at = now()
WHERE verification_token = $1
RETURNING *
";

/// Patch profile fields; `NULL` keeps the current value.
pub const UPDATE_PROFILE: &str = r"
UPDATE users
SET name = COALESCE($2, name),
    description = COALESCE($3, description),
    role = COALESCE($4, role),
    updated_at = now()
WHERE id = $1
RETURNING *
";

/// Set the level threshold.
pub const SET_LEVEL_THRESHOLD: &str = r"
UPDATE users SET level_threshold = $2, updated_at = now() WHERE id = $1 RETURNING *
";

/// Set the goodbye message.
pub const SET_GOODBYE_MESSAGE: &str = r"
UPDATE users SET goodbye_message = $2, updated_at = now() WHERE id = $1 RETURNING *
";

/// Delete a user; foreign keys cascade to everything it owns.
pub const DELETE_USER: &str = "DELETE FROM users WHERE id = $1";

/// Every live user, newest broadcast first.
pub const LIST_LIVE: &str = r"
SELECT * FROM users WHERE is_live ORDER BY live_started_at DESC NULLS LAST
";

/// Credit points unconditionally.
pub const ADD_POINTS: &str = r"
UPDATE users SET points = points + $2, updated_at = now() WHERE id = $1 RETURNING points
";

/// Current coin and point balances.
pub const GET_BALANCES: &str = "SELECT coins, points FROM users WHERE id = $1";

// ============================================================================
// Catalog
// ============================================================================

/// All gifts, cheapest first.
pub const LIST_GIFTS: &str = "SELECT * FROM gifts ORDER BY cost, id";

/// Fetch a gift by id.
pub const GET_GIFT: &str = "SELECT * FROM gifts WHERE id = $1";

/// Insert a gift.
pub const INSERT_GIFT: &str = r"
INSERT INTO gifts (name, cost, emoji, owner_id) VALUES ($1, $2, $3, $4) RETURNING *
";

/// Seed a default gift unless one with the same name exists.
pub const SEED_GIFT: &str = r"
INSERT INTO gifts (name, cost, emoji)
SELECT $1, $2, $3
WHERE NOT EXISTS (SELECT 1 FROM gifts WHERE owner_id IS NULL AND name = $1)
";

/// Delete a gift; activation rows cascade.
pub const DELETE_GIFT: &str = "DELETE FROM gifts WHERE id = $1";

/// Defaults plus the streamer's customs, with whether an activation row exists.
pub const LIST_PANEL_GIFTS: &str = r"
SELECT g.id, g.name, g.cost, g.emoji, g.owner_id, (sg.gift_id IS NOT NULL) AS has_row
FROM gifts g
LEFT JOIN streamer_gifts sg ON sg.gift_id = g.id AND sg.streamer_id = $1
WHERE g.owner_id IS NULL OR g.owner_id = $1
ORDER BY g.cost, g.id
";

/// Remove an activation row.
pub const DELETE_ACTIVATION: &str = r"
DELETE FROM streamer_gifts WHERE streamer_id = $1 AND gift_id = $2
";

/// Add an activation row.
pub const INSERT_ACTIVATION: &str = r"
INSERT INTO streamer_gifts (streamer_id, gift_id) VALUES ($1, $2) ON CONFLICT DO NOTHING
";

/// Coin packs on sale.
pub const LIST_COIN_PACKS: &str = "SELECT * FROM coin_packs WHERE is_active ORDER BY coins";

/// Fetch a coin pack by id.
pub const GET_COIN_PACK: &str = "SELECT * FROM coin_packs WHERE id = $1";

/// Seed a coin pack.
pub const SEED_COIN_PACK: &str = r"
INSERT INTO coin_packs (coins, price_cents, points_awarded)
VALUES ($1, $2, $3)
ON CONFLICT (coins) DO NOTHING
";

// ============================================================================
// Ledger
// ============================================================================

/// Insert a ledger entry.
pub const INSERT_TRANSACTION: &str = r"
INSERT INTO transactions (
    id, user_id, kind, status, amount, price_cents, points,
    target_streamer_id, created_at, completed_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
";

/// Fetch a ledger entry.
pub const GET_TRANSACTION: &str = "SELECT * FROM transactions WHERE id = $1";

/// Fetch and lock a ledger entry for completion.
pub const LOCK_TRANSACTION: &str = "SELECT * FROM transactions WHERE id = $1 FOR UPDATE";

/// A user's ledger, newest first (ULIDs sort by time).
pub const LIST_TRANSACTIONS_BY_USER: &str = r"
SELECT * FROM transactions WHERE user_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3
";

/// Streamer-directed, point-earning entries of a user with the streamer's current settings.
pub const LIST_POINT_EARNINGS: &str = r"
SELECT t.target_streamer_id AS streamer_id,
       u.name AS streamer_name,
       u.level_threshold AS streamer_threshold,
       t.points
FROM transactions t
JOIN users u ON u.id = t.target_streamer_id
WHERE t.user_id = $1 AND t.points > 0
";

/// Debit a gift's cost and credit its XP, only if the coins are there.
pub const DEBIT_FOR_GIFT: &str = r"
UPDATE users
SET coins = coins - $2, points = points + $3, updated_at = now()
WHERE id = $1 AND coins >= $2
RETURNING *
";

/// Flip a pending entry to completed.
pub const MARK_COMPLETED: &str = r"
UPDATE transactions
SET status = 'COMPLETED', completed_at = $2
WHERE id = $1 AND status = 'PENDING'
RETURNING *
";

/// Credit a completed entry to its owner.
pub const CREDIT_USER: &str = r"
UPDATE users
SET coins = coins + $2, points = points + $3, updated_at = now()
WHERE id = $1
RETURNING *
";

/// Exchange points for coins, only if the points are there.
pub const REDEEM_POINTS: &str = r"
UPDATE users
SET points = points - $2, coins = coins + $3, updated_at = now()
WHERE id = $1 AND points >= $2
RETURNING *
";

// ============================================================================
// Subscriptions
// ============================================================================

/// Open a subscription if absent.
pub const INSERT_SUBSCRIPTION: &str = r"
INSERT INTO subscriptions (subscriber_id, streamer_id, created_at)
VALUES ($1, $2, $3)
ON CONFLICT DO NOTHING
";

/// Fetch a subscription.
pub const GET_SUBSCRIPTION: &str = r"
SELECT * FROM subscriptions WHERE subscriber_id = $1 AND streamer_id = $2
";

/// Delete a subscription.
pub const DELETE_SUBSCRIPTION: &str = r"
DELETE FROM subscriptions WHERE subscriber_id = $1 AND streamer_id = $2 RETURNING *
";

// ============================================================================
// Live Sessions
// ============================================================================

/// Go live; a running broadcast keeps its original checkpoint.
pub const START_LIVE: &str = r"
UPDATE users
SET live_started_at = CASE
        WHEN is_live AND live_started_at IS NOT NULL THEN live_started_at
        ELSE $2
    END,
    is_live = TRUE,
    stream_title = $3,
    stream_category = $4,
    updated_at = $2
WHERE id = $1
RETURNING *
";

/// Lock the live fields of a user.
pub const LOCK_LIVE_STATE: &str = r"
SELECT is_live, live_started_at FROM users WHERE id = $1 FOR UPDATE
";

/// Close a broadcast and credit its hours.
pub const STOP_LIVE: &str = r"
UPDATE users
SET is_live = FALSE,
    live_started_at = NULL,
    stream_title = NULL,
    stream_category = NULL,
    total_live_hours = total_live_hours + $2,
    updated_at = $3
WHERE id = $1
RETURNING *
";

// ============================================================================
// Chat
// ============================================================================

/// Persist a chat message.
pub const INSERT_MESSAGE: &str = r"
INSERT INTO messages (id, stream_id, user_id, text, created_at) VALUES ($1, $2, $3, $4, $5)
";

/// The latest messages (optionally of one room), returned oldest first.
pub const LIST_MESSAGES: &str = r"
SELECT * FROM (
    SELECT m.id, m.stream_id, m.user_id, m.text, m.created_at, u.name AS username
    FROM messages m
    JOIN users u ON u.id = m.user_id
    WHERE $1::TEXT IS NULL OR m.stream_id = $1
    ORDER BY m.created_at DESC, m.id DESC
    LIMIT $2
) recent
ORDER BY created_at, id
";
