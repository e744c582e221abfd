//! Community progress: a fan's level with every streamer they supported.

use unistream_core::{aggregate, Result, StreamerProgress, UserId};
use unistream_store::Store;

use crate::economy::require_user;

/// Per-streamer progress of `fan_id`, graded with each streamer's current
/// threshold, highest XP first.
pub async fn community_progress(store: &dyn Store, fan_id: &UserId) -> Result<Vec<StreamerProgress>> {
    let fan = require_user(store, fan_id).await?;
    let earnings = store.list_point_earnings(&fan.id).await?;
    let progress = aggregate(earnings);
    tracing::debug!(user_id = %fan.id, streamers = progress.len(), "Community progress computed");
    Ok(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use unistream_core::{gift_xp, EconomyError, Role, Transaction, User};
    use unistream_store::MemoryStore;

    async fn user(store: &MemoryStore, name: &str, role: Role, coins: i64) -> User {
        let user = User::new(format!("{name}@ulima.edu.pe"), name, "hash", role);
        store.create_user(&user).await.unwrap();
        store.set_balances(&user.id, coins, 0).unwrap();
        user
    }

    #[tokio::test]
    async fn groups_gifts_per_streamer() {
        let store = MemoryStore::with_defaults();
        let fan = user(&store, "fan", Role::Fan, 10_000).await;
        let gozu = user(&store, "Gozu", Role::Streamer, 0).await;
        let mika = user(&store, "Mika", Role::Streamer, 0).await;
        store.set_level_threshold(&mika.id, 100).await.unwrap();

        for (streamer, cost) in [(&gozu, 50), (&gozu, 25), (&mika, 5)] {
            store
                .apply_gift(&Transaction::gift(fan.id, streamer.id, cost, gift_xp(cost)))
                .await
                .unwrap();
        }
        // Purchases carry points but no streamer.
        store
            .create_transaction(&Transaction::pending_purchase(fan.id, 100, 500, 10))
            .await
            .unwrap();

        let progress = community_progress(&store, &fan.id).await.unwrap();
        assert_eq!(progress.len(), 2);

        assert_eq!(progress[0].streamer_name, "Gozu");
        assert_eq!(progress[0].xp_local, 750);
        assert_eq!(progress[0].current_level, 2);
        assert_eq!(progress[0].points_to_next_level, 250);

        assert_eq!(progress[1].streamer_name, "Mika");
        assert_eq!(progress[1].xp_local, 50);
        assert_eq!(progress[1].xp_threshold, 100);
        assert_eq!(progress[1].progress_percent, 50);
    }

    #[tokio::test]
    async fn fan_without_gifts_has_no_progress() {
        let store = MemoryStore::with_defaults();
        let fan = user(&store, "fan", Role::Fan, 0).await;
        assert!(community_progress(&store, &fan.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_fan_is_not_found() {
        let store = MemoryStore::with_defaults();
        assert!(matches!(
            community_progress(&store, &UserId::generate()).await,
            Err(EconomyError::UserNotFound(_))
        ));
    }
}
