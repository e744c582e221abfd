//! Live session tracker.
//!
//! The store keeps the start checkpoint; nothing here holds a timer. Start
//! and stop both read the clock at the moment of the request, so a stop
//! served by another instance after a restart credits the same hours.

use chrono::{DateTime, Utc};
use serde::Serialize;

use unistream_core::leveling::{next_streamer_level_at, streamer_level};
use unistream_core::{EconomyError, RealtimeEvent, Result, UserId};
use unistream_store::Store;

use crate::economy::require_streamer;
use crate::notifier::{dispatch_all, Notifier};

/// A broadcast in the live directory.
#[derive(Debug, Clone, Serialize)]
pub struct LiveStream {
    /// The streamer.
    pub streamer_id: UserId,
    /// Streamer display name.
    pub name: String,
    /// Broadcast title.
    pub title: Option<String>,
    /// Broadcast category.
    pub category: Option<String>,
    /// Server-side start checkpoint.
    pub started_at: Option<DateTime<Utc>>,
    /// Broadcasting level of the streamer.
    pub streamer_level: i64,
}

/// Result of ending a broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct StreamStopped {
    /// The streamer.
    pub streamer_id: UserId,
    /// Hours credited for this session.
    pub session_hours: f64,
    /// Cumulative broadcast hours.
    pub total_hours: f64,
    /// Broadcasting level after the credit.
    pub streamer_level: i64,
    /// Hours at which the next broadcasting level is reached.
    pub next_level_at: f64,
}

/// Go live. Starting while already live keeps the original checkpoint.
pub async fn start(
    store: &dyn Store,
    notifier: &dyn Notifier,
    streamer_id: &UserId,
    title: &str,
    category: Option<&str>,
) -> Result<LiveStream> {
    let streamer = require_streamer(store, streamer_id).await?;
    let title = title.trim();
    if title.is_empty() {
        return Err(EconomyError::InvalidInput("stream title is required".into()));
    }
    let category = category.map(str::trim).filter(|c| !c.is_empty());

    let user = store
        .start_live(&streamer.id, title, category, Utc::now())
        .await?;
    let started_at = user.live_started_at.unwrap_or(user.updated_at);

    tracing::info!(
        streamer_id = %user.id,
        started_at = %started_at,
        resumed = streamer.is_live,
        "Stream started"
    );

    dispatch_all(
        notifier,
        &RealtimeEvent::StreamStarted {
            streamer_id: user.id,
            name: user.name.clone(),
            title: user.stream_title.clone(),
            category: user.stream_category.clone(),
            started_at,
        },
    );

    Ok(LiveStream {
        streamer_id: user.id,
        streamer_level: user.streamer_level(),
        name: user.name,
        title: user.stream_title,
        category: user.stream_category,
        started_at: user.live_started_at,
    })
}

/// End the running broadcast and credit its hours.
pub async fn stop(
    store: &dyn Store,
    notifier: &dyn Notifier,
    streamer_id: &UserId,
) -> Result<StreamStopped> {
    let stopped = store.stop_live(streamer_id, Utc::now()).await?;
    let summary = stopped.summary;

    if !summary.had_checkpoint {
        tracing::warn!(streamer_id = %streamer_id, "Stream stopped without a start checkpoint");
    }
    tracing::info!(
        streamer_id = %streamer_id,
        session_hours = summary.session_hours,
        total_hours = summary.total_hours,
        "Stream ended"
    );

    dispatch_all(
        notifier,
        &RealtimeEvent::StreamEnded {
            streamer_id: *streamer_id,
            session_hours: summary.session_hours,
            total_hours: summary.total_hours,
        },
    );

    Ok(StreamStopped {
        streamer_id: *streamer_id,
        session_hours: summary.session_hours,
        total_hours: summary.total_hours,
        streamer_level: streamer_level(summary.total_hours),
        next_level_at: next_streamer_level_at(summary.total_hours),
    })
}

/// Every broadcast currently running.
pub async fn live_streams(store: &dyn Store) -> Result<Vec<LiveStream>> {
    Ok(store
        .list_live_streamers()
        .await?
        .into_iter()
        .map(|user| LiveStream {
            streamer_id: user.id,
            streamer_level: user.streamer_level(),
            name: user.name,
            title: user.stream_title,
            category: user.stream_category,
            started_at: user.live_started_at,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::Hub;
    use unistream_core::{Role, User};
    use unistream_store::MemoryStore;

    async fn streamer(store: &MemoryStore) -> User {
        let user = User::new("gozu@ulima.edu.pe", "Gozu", "hash", Role::Streamer);
        store.create_user(&user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn start_announces_and_lists_the_stream() {
        let store = MemoryStore::new();
        let hub = Hub::new();
        let (_conn, mut rx) = hub.register();
        let user = streamer(&store).await;

        let live = start(&store, &hub, &user.id, "  Física I  ", Some("study"))
            .await
            .unwrap();
        assert_eq!(live.title.as_deref(), Some("Física I"));
        assert!(live.started_at.is_some());

        let frame: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame["event"], "stream_started");
        assert_eq!(frame["payload"]["name"], "Gozu");

        let streams = live_streams(&store).await.unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].streamer_id, user.id);
    }

    #[tokio::test]
    async fn restart_keeps_checkpoint() {
        let store = MemoryStore::new();
        let hub = Hub::new();
        let user = streamer(&store).await;

        let first = start(&store, &hub, &user.id, "Uno", None).await.unwrap();
        let second = start(&store, &hub, &user.id, "Dos", None).await.unwrap();
        assert_eq!(first.started_at, second.started_at);
        assert_eq!(second.title.as_deref(), Some("Dos"));
    }

    #[tokio::test]
    async fn fans_and_blank_titles_are_rejected() {
        let store = MemoryStore::new();
        let hub = Hub::new();
        let fan = User::new("fan@ulima.edu.pe", "Fan", "hash", Role::Fan);
        store.create_user(&fan).await.unwrap();
        let user = streamer(&store).await;

        assert!(matches!(
            start(&store, &hub, &fan.id, "Hola", None).await,
            Err(EconomyError::Forbidden(_))
        ));
        assert!(matches!(
            start(&store, &hub, &user.id, "   ", None).await,
            Err(EconomyError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn stop_credits_hours_and_announces() {
        let store = MemoryStore::new();
        let hub = Hub::new();
        let user = streamer(&store).await;
        start(&store, &hub, &user.id, "Álgebra", None).await.unwrap();

        let (_conn, mut rx) = hub.register();
        let stopped = stop(&store, &hub, &user.id).await.unwrap();
        assert!(stopped.session_hours >= 0.0);
        assert!(stopped.session_hours < 0.01);
        assert_eq!(stopped.streamer_level, 1);
        assert!((stopped.next_level_at - 10.0).abs() < f64::EPSILON);

        let frame: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame["event"], "stream_ended");
        assert!(live_streams(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stop_when_not_live_is_invalid_state() {
        let store = MemoryStore::new();
        let hub = Hub::new();
        let user = streamer(&store).await;
        assert!(matches!(
            stop(&store, &hub, &user.id).await,
            Err(EconomyError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn live_without_checkpoint_stops_with_zero_hours() {
        let store = MemoryStore::new();
        let hub = Hub::new();
        let mut user = User::new("legacy@ulima.edu.pe", "Legacy", "hash", Role::Streamer);
        user.is_live = true;
        user.live_started_at = None;
        user.total_live_hours = 25.0;
        store.create_user(&user).await.unwrap();

        let (_conn, mut rx) = hub.register();
        let stopped = stop(&store, &hub, &user.id).await.unwrap();
        assert!(stopped.session_hours.abs() < f64::EPSILON);
        assert!((stopped.total_hours - 25.0).abs() < f64::EPSILON);
        assert_eq!(stopped.streamer_level, 3);

        let reloaded = store.get_user(&user.id).await.unwrap().unwrap();
        assert!(!reloaded.is_live);
        assert!((reloaded.total_live_hours - 25.0).abs() < f64::EPSILON);

        let frame: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame["event"], "stream_ended");
        assert_eq!(frame["payload"]["session_hours"], 0.0);
        assert_eq!(frame["payload"]["total_hours"], 25.0);
    }
}
