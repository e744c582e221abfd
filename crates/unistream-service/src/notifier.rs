//! Realtime event fan-out.
//!
//! [`Hub`] keeps one bounded outbound queue per WebSocket connection plus the
//! rooms each connection joined. Delivery never waits: a full or closed queue
//! drops the event for that connection only.
//!
//! Callers go through [`dispatch_all`] / [`dispatch_to_room`] after the state
//! change they announce has been committed. Those helpers log failures and
//! never return them, so a broken socket can't fail a gift or a stream start.

use std::collections::HashSet;

use dashmap::DashMap;
use tokio::sync::mpsc;

use unistream_core::RealtimeEvent;

/// Per-connection outbound queue capacity.
pub const CONNECTION_QUEUE_CAPACITY: usize = 64;

/// Errors raised while publishing an event.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The event could not be encoded.
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// How a broadcast went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Connections the frame was queued for.
    pub delivered: usize,
    /// Connections skipped because their queue was full or closed.
    pub dropped: usize,
}

/// Pushes realtime events to connected clients.
pub trait Notifier: Send + Sync {
    /// Send `event` to every connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be encoded.
    fn broadcast_all(&self, event: &RealtimeEvent) -> Result<Delivery, NotifyError>;

    /// Send `event` to the connections that joined `room`.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be encoded.
    fn broadcast_to_room(&self, room: &str, event: &RealtimeEvent)
        -> Result<Delivery, NotifyError>;
}

struct Connection {
    tx: mpsc::Sender<String>,
    rooms: HashSet<String>,
}

/// Registry of live WebSocket connections.
#[derive(Default)]
pub struct Hub {
    connections: DashMap<String, Connection>,
}

impl Hub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. Returns its id and the receiving half of its
    /// outbound queue.
    pub fn register(&self) -> (String, mpsc::Receiver<String>) {
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(CONNECTION_QUEUE_CAPACITY);
        self.connections.insert(
            id.clone(),
            Connection {
                tx,
                rooms: HashSet::new(),
            },
        );
        tracing::debug!(connection_id = %id, "WebSocket connection registered");
        (id, rx)
    }

    /// Forget a connection.
    pub fn unregister(&self, id: &str) {
        if self.connections.remove(id).is_some() {
            tracing::debug!(connection_id = %id, "WebSocket connection removed");
        }
    }

    /// Add a connection to a room. Returns `false` for an unknown connection.
    pub fn join(&self, id: &str, room: &str) -> bool {
        self.connections
            .get_mut(id)
            .map(|mut conn| conn.rooms.insert(room.to_string()))
            .is_some()
    }

    /// Remove a connection from a room.
    pub fn leave(&self, id: &str, room: &str) {
        if let Some(mut conn) = self.connections.get_mut(id) {
            conn.rooms.remove(room);
        }
    }

    /// Number of open connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn fan_out(&self, frame: &str, room: Option<&str>) -> Delivery {
        let mut delivery = Delivery::default();
        for conn in &self.connections {
            if room.is_some_and(|room| !conn.rooms.contains(room)) {
                continue;
            }
            match conn.tx.try_send(frame.to_string()) {
                Ok(()) => delivery.delivered += 1,
                Err(_) => delivery.dropped += 1,
            }
        }
        delivery
    }
}

impl Notifier for Hub {
    fn broadcast_all(&self, event: &RealtimeEvent) -> Result<Delivery, NotifyError> {
        let frame = serde_json::to_string(event)?;
        Ok(self.fan_out(&frame, None))
    }

    fn broadcast_to_room(
        &self,
        room: &str,
        event: &RealtimeEvent,
    ) -> Result<Delivery, NotifyError> {
        let frame = serde_json::to_string(event)?;
        Ok(self.fan_out(&frame, Some(room)))
    }
}

/// Publish `event` to everyone, logging instead of failing.
pub fn dispatch_all(notifier: &dyn Notifier, event: &RealtimeEvent) {
    report(event, None, notifier.broadcast_all(event));
}

/// Publish `event` to `room`, logging instead of failing.
pub fn dispatch_to_room(notifier: &dyn Notifier, room: &str, event: &RealtimeEvent) {
    report(event, Some(room), notifier.broadcast_to_room(room, event));
}

fn report(event: &RealtimeEvent, room: Option<&str>, result: Result<Delivery, NotifyError>) {
    match result {
        Ok(delivery) if delivery.dropped > 0 => tracing::warn!(
            event = event.name(),
            room = room.unwrap_or("*"),
            delivered = delivery.delivered,
            dropped = delivery.dropped,
            "Realtime event dropped for slow or closed connections"
        ),
        Ok(delivery) => tracing::debug!(
            event = event.name(),
            room = room.unwrap_or("*"),
            delivered = delivery.delivered,
            "Realtime event published"
        ),
        Err(e) => tracing::warn!(
            event = event.name(),
            error = %e,
            "Failed to publish realtime event"
        ),
    }
}
