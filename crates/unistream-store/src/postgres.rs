//! PostgreSQL store implementation.
//!
//! Every compound operation runs inside one `sqlx` transaction. Balance
//! checks are folded into conditional `UPDATE ... WHERE coins >= $n`
//! statements, and completions are guarded by `status = 'PENDING'` on a row
//! locked with `FOR UPDATE`, so concurrent requests apply at most once.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use unistream_core::{
    default_coin_packs, default_gifts, session_hours, ChatHistoryEntry, ChatMessage, CoinPack,
    Gift, GiftId, MessageId, NewGift, PanelGift, PointEarning, ProfileUpdate, Role,
    SessionSummary, Subscription, Transaction, TransactionId, TransactionKind, TransactionStatus,
    User, UserId,
};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::queries;
use crate::{Completion, StoppedSession, Store};

/// PostgreSQL-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations and seed the default catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration or seed statement fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;

        let mut tx = self.pool.begin().await?;
        for gift in default_gifts() {
            sqlx::query(queries::SEED_GIFT)
                .bind(&gift.name)
                .bind(gift.cost)
                .bind(&gift.emoji)
                .execute(&mut *tx)
                .await?;
        }
        for pack in default_coin_packs() {
            sqlx::query(queries::SEED_COIN_PACK)
                .bind(pack.coins)
                .bind(pack.price_cents)
                .bind(pack.points_awarded)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::info!("Database migrated and catalog seeded");
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ============================================================================
// Row decoding
// ============================================================================

fn user_id(row: &PgRow, column: &str) -> Result<UserId> {
    Ok(UserId::from_uuid(row.try_get::<Uuid, _>(column)?))
}

fn optional_user_id(row: &PgRow, column: &str) -> Result<Option<UserId>> {
    Ok(row
        .try_get::<Option<Uuid>, _>(column)?
        .map(UserId::from_uuid))
}

fn parse_column<T: FromStr>(row: &PgRow, column: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e: T::Err| StoreError::Corrupt(format!("{column}: {e}")))
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: user_id(row, "id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        password_hash: row.try_get("password_hash")?,
        role: parse_column::<Role>(row, "role")?,
        is_verified: row.try_get("is_verified")?,
        verification_token: row.try_get("verification_token")?,
        description: row.try_get("description")?,
        coins: row.try_get("coins")?,
        points: row.try_get("points")?,
        level_threshold: row.try_get("level_threshold")?,
        is_live: row.try_get("is_live")?,
        live_started_at: row.try_get("live_started_at")?,
        total_live_hours: row.try_get("total_live_hours")?,
        stream_title: row.try_get("stream_title")?,
        stream_category: row.try_get("stream_category")?,
        goodbye_message: row.try_get("goodbye_message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn gift_from_row(row: &PgRow) -> Result<Gift> {
    Ok(Gift {
        id: GiftId(row.try_get("id")?),
        name: row.try_get("name")?,
        cost: row.try_get("cost")?,
        emoji: row.try_get("emoji")?,
        owner_id: optional_user_id(row, "owner_id")?,
    })
}

fn coin_pack_from_row(row: &PgRow) -> Result<CoinPack> {
    Ok(CoinPack {
        id: row.try_get("id")?,
        coins: row.try_get("coins")?,
        price_cents: row.try_get("price_cents")?,
        points_awarded: row.try_get("points_awarded")?,
        is_active: row.try_get("is_active")?,
    })
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction> {
    Ok(Transaction {
        id: parse_column::<TransactionId>(row, "id")?,
        user_id: user_id(row, "user_id")?,
        kind: parse_column::<TransactionKind>(row, "kind")?,
        status: parse_column::<TransactionStatus>(row, "status")?,
        amount: row.try_get("amount")?,
        price_cents: row.try_get("price_cents")?,
        points: row.try_get("points")?,
        target_streamer_id: optional_user_id(row, "target_streamer_id")?,
        created_at: row.try_get("created_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn subscription_from_row(row: &PgRow) -> Result<Subscription> {
    Ok(Subscription {
        subscriber_id: user_id(row, "subscriber_id")?,
        streamer_id: user_id(row, "streamer_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl PgStore {
    /// Balances of `id`, used to report why a conditional update matched nothing.
    async fn balances(conn: &mut sqlx::PgConnection, id: &UserId) -> Result<(i64, i64)> {
        let row = sqlx::query(queries::GET_BALANCES)
            .bind(id.as_uuid())
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| StoreError::not_found("user", id))?;
        Ok((row.try_get("coins")?, row.try_get("points")?))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    async fn create_user(&self, user: &User) -> Result<()> {
        sqlx::query(queries::INSERT_USER)
            .bind(user.id.as_uuid())
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(&user.description)
            .bind(user.coins)
            .bind(user.points)
            .bind(user.level_threshold)
            .bind(user.is_live)
            .bind(user.live_started_at)
            .bind(user.total_live_hours)
            .bind(&user.stream_title)
            .bind(&user.stream_category)
            .bind(&user.goodbye_message)
            .bind(user.created_at)
            .bind(user.updated_at)
            .bind(user.is_verified)
            .bind(&user.verification_token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        sqlx::query(queries::GET_USER)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query(queries::FIND_USER_BY_EMAIL)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn verify_user(&self, token: &str) -> Result<Option<User>> {
        sqlx::query(queries::VERIFY_USER)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn update_profile(&self, id: &UserId, update: &ProfileUpdate) -> Result<User> {
        let row = sqlx::query(queries::UPDATE_PROFILE)
            .bind(id.as_uuid())
            .bind(&update.name)
            .bind(&update.description)
            .bind(update.role.map(|r| r.as_str()))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("user", id))?;
        user_from_row(&row)
    }

    async fn set_level_threshold(&self, id: &UserId, threshold: i64) -> Result<User> {
        let row = sqlx::query(queries::SET_LEVEL_THRESHOLD)
            .bind(id.as_uuid())
            .bind(threshold)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("user", id))?;
        user_from_row(&row)
    }

    async fn set_goodbye_message(&self, id: &UserId, message: Option<&str>) -> Result<User> {
        let row = sqlx::query(queries::SET_GOODBYE_MESSAGE)
            .bind(id.as_uuid())
            .bind(message)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("user", id))?;
        user_from_row(&row)
    }

    async fn delete_user(&self, id: &UserId) -> Result<()> {
        let result = sqlx::query(queries::DELETE_USER)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user", id));
        }
        Ok(())
    }

    async fn list_live_streamers(&self) -> Result<Vec<User>> {
        sqlx::query(queries::LIST_LIVE)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(user_from_row)
            .collect()
    }

    async fn add_points(&self, id: &UserId, points: i64) -> Result<i64> {
        let row = sqlx::query(queries::ADD_POINTS)
            .bind(id.as_uuid())
            .bind(points)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("user", id))?;
        Ok(row.try_get("points")?)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    async fn list_gifts(&self) -> Result<Vec<Gift>> {
        sqlx::query(queries::LIST_GIFTS)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(gift_from_row)
            .collect()
    }

    async fn get_gift(&self, id: GiftId) -> Result<Option<Gift>> {
        sqlx::query(queries::GET_GIFT)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(gift_from_row)
            .transpose()
    }

    async fn create_gift(&self, gift: &NewGift) -> Result<Gift> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(queries::INSERT_GIFT)
            .bind(&gift.name)
            .bind(gift.cost)
            .bind(&gift.emoji)
            .bind(gift.owner_id.as_ref().map(UserId::as_uuid))
            .fetch_one(&mut *tx)
            .await?;
        let created = gift_from_row(&row)?;
        if let Some(owner) = &created.owner_id {
            sqlx::query(queries::INSERT_ACTIVATION)
                .bind(owner.as_uuid())
                .bind(created.id.0)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn delete_gift(&self, id: GiftId) -> Result<()> {
        let result = sqlx::query(queries::DELETE_GIFT)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("gift", id));
        }
        Ok(())
    }

    async fn list_panel_gifts(&self, streamer: &UserId) -> Result<Vec<PanelGift>> {
        sqlx::query(queries::LIST_PANEL_GIFTS)
            .bind(streamer.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| {
                let gift = gift_from_row(row)?;
                let has_row: bool = row.try_get("has_row")?;
                Ok(PanelGift {
                    is_active: gift.is_active_for(has_row),
                    is_custom: !gift.is_default(),
                    gift,
                })
            })
            .collect()
    }

    async fn toggle_gift_activation(&self, streamer: &UserId, gift: GiftId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query(queries::DELETE_ACTIVATION)
            .bind(streamer.as_uuid())
            .bind(gift.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            sqlx::query(queries::INSERT_ACTIVATION)
                .bind(streamer.as_uuid())
                .bind(gift.0)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(removed == 0)
    }

    async fn list_coin_packs(&self) -> Result<Vec<CoinPack>> {
        sqlx::query(queries::LIST_COIN_PACKS)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(coin_pack_from_row)
            .collect()
    }

    async fn get_coin_pack(&self, id: i64) -> Result<Option<CoinPack>> {
        sqlx::query(queries::GET_COIN_PACK)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(coin_pack_from_row)
            .transpose()
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    async fn create_transaction(&self, transaction: &Transaction) -> Result<()> {
        insert_transaction(&self.pool, transaction).await
    }

    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        sqlx::query(queries::GET_TRANSACTION)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(transaction_from_row)
            .transpose()
    }

    async fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>> {
        sqlx::query(queries::LIST_TRANSACTIONS_BY_USER)
            .bind(user_id.as_uuid())
            .bind(to_i64(limit))
            .bind(to_i64(offset))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(transaction_from_row)
            .collect()
    }

    async fn list_point_earnings(&self, fan_id: &UserId) -> Result<Vec<PointEarning>> {
        sqlx::query(queries::LIST_POINT_EARNINGS)
            .bind(fan_id.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| {
                Ok(PointEarning {
                    streamer_id: user_id(row, "streamer_id")?,
                    streamer_name: row.try_get("streamer_name")?,
                    streamer_threshold: row.try_get("streamer_threshold")?,
                    points: row.try_get("points")?,
                })
            })
            .collect()
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    async fn apply_gift(&self, receipt: &Transaction) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let debited = sqlx::query(queries::DEBIT_FOR_GIFT)
            .bind(receipt.user_id.as_uuid())
            .bind(receipt.amount)
            .bind(receipt.points)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = debited else {
            let (coins, _) = Self::balances(&mut *tx, &receipt.user_id).await?;
            return Err(StoreError::InsufficientFunds {
                balance: coins,
                required: receipt.amount,
            });
        };
        let sender = user_from_row(&row)?;

        insert_transaction(&mut *tx, receipt).await?;
        tx.commit().await?;
        Ok(sender)
    }

    async fn complete_transaction(&self, id: &TransactionId) -> Result<Completion> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(queries::LOCK_TRANSACTION)
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("transaction", id))?;
        let transaction = transaction_from_row(&row)?;

        let flipped = sqlx::query(queries::MARK_COMPLETED)
            .bind(id.to_string())
            .bind(Utc::now())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(flipped) = flipped else {
            let user = sqlx::query(queries::GET_USER)
                .bind(transaction.user_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| StoreError::not_found("user", transaction.user_id))?;
            tx.commit().await?;
            return Ok(Completion {
                transaction,
                user: user_from_row(&user)?,
                already_completed: true,
                subscription_created: false,
            });
        };
        let transaction = transaction_from_row(&flipped)?;

        let mut subscription_created = false;
        let subscribe_to = transaction
            .target_streamer_id
            .filter(|_| transaction.grants_subscription());
        if let Some(streamer) = subscribe_to {
            subscription_created = sqlx::query(queries::INSERT_SUBSCRIPTION)
                .bind(transaction.user_id.as_uuid())
                .bind(streamer.as_uuid())
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?
                .rows_affected()
                == 1;
        }

        let user = sqlx::query(queries::CREDIT_USER)
            .bind(transaction.user_id.as_uuid())
            .bind(transaction.coins_on_completion())
            .bind(transaction.points)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("user", transaction.user_id))?;
        let user = user_from_row(&user)?;

        tx.commit().await?;
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
        let mut tx = self.pool.begin().await?;
        let redeemed = sqlx::query(queries::REDEEM_POINTS)
            .bind(user_id.as_uuid())
            .bind(points_cost)
            .bind(coins_granted)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = redeemed else {
            let (_, points) = Self::balances(&mut *tx, user_id).await?;
            return Err(StoreError::InsufficientPoints {
                balance: points,
                required: points_cost,
            });
        };
        let user = user_from_row(&row)?;
        tx.commit().await?;
        Ok(user)
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    async fn get_subscription(
        &self,
        subscriber: &UserId,
        streamer: &UserId,
    ) -> Result<Option<Subscription>> {
        sqlx::query(queries::GET_SUBSCRIPTION)
            .bind(subscriber.as_uuid())
            .bind(streamer.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(subscription_from_row)
            .transpose()
    }

    async fn delete_subscription(
        &self,
        subscriber: &UserId,
        streamer: &UserId,
    ) -> Result<Option<Subscription>> {
        sqlx::query(queries::DELETE_SUBSCRIPTION)
            .bind(subscriber.as_uuid())
            .bind(streamer.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(subscription_from_row)
            .transpose()
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
        let row = sqlx::query(queries::START_LIVE)
            .bind(id.as_uuid())
            .bind(now)
            .bind(title)
            .bind(category)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("user", id))?;
        user_from_row(&row)
    }

    async fn stop_live(&self, id: &UserId, now: DateTime<Utc>) -> Result<StoppedSession> {
        let mut tx = self.pool.begin().await?;

        let state = sqlx::query(queries::LOCK_LIVE_STATE)
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("user", id))?;
        let is_live: bool = state.try_get("is_live")?;
        if !is_live {
            return Err(StoreError::InvalidState(format!("user {id} is not live")));
        }
        let started_at: Option<DateTime<Utc>> = state.try_get("live_started_at")?;
        let hours = session_hours(started_at, now);

        let row = sqlx::query(queries::STOP_LIVE)
            .bind(id.as_uuid())
            .bind(hours)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
        let user = user_from_row(&row)?;
        tx.commit().await?;

        Ok(StoppedSession {
            summary: SessionSummary {
                session_hours: hours,
                total_hours: user.total_live_hours,
                had_checkpoint: started_at.is_some(),
            },
            user,
        })
    }

    // =========================================================================
    // Chat
    // =========================================================================

    async fn insert_message(&self, message: &ChatMessage) -> Result<()> {
        sqlx::query(queries::INSERT_MESSAGE)
            .bind(message.id.to_string())
            .bind(&message.stream_id)
            .bind(message.user_id.as_uuid())
            .bind(&message.text)
            .bind(message.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_messages(
        &self,
        stream_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ChatHistoryEntry>> {
        sqlx::query(queries::LIST_MESSAGES)
            .bind(stream_id)
            .bind(to_i64(limit))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| {
                Ok(ChatHistoryEntry {
                    message: ChatMessage {
                        id: parse_column::<MessageId>(row, "id")?,
                        stream_id: row.try_get("stream_id")?,
                        user_id: user_id(row, "user_id")?,
                        text: row.try_get("text")?,
                        created_at: row.try_get("created_at")?,
                    },
                    username: row.try_get("username")?,
                })
            })
            .collect()
    }
}

async fn insert_transaction<'e, E>(executor: E, transaction: &Transaction) -> Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(queries::INSERT_TRANSACTION)
        .bind(transaction.id.to_string())
        .bind(transaction.user_id.as_uuid())
        .bind(transaction.kind.as_str())
        .bind(transaction.status.as_str())
        .bind(transaction.amount)
        .bind(transaction.price_cents)
        .bind(transaction.points)
        .bind(transaction.target_streamer_id.as_ref().map(UserId::as_uuid))
        .bind(transaction.created_at)
        .bind(transaction.completed_at)
        .execute(executor)
        .await
        .map_err(|e| {
            let missing_owner =
                matches!(&e, sqlx::Error::Database(db) if db.is_foreign_key_violation());
            if missing_owner {
                StoreError::not_found("user", transaction.user_id)
            } else {
                e.into()
            }
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usize_conversion_saturates() {
        assert_eq!(to_i64(25), 25);
        assert_eq!(to_i64(usize::MAX), i64::MAX);
    }
}
