//! Connection registry
//!
//! Maps each room to the live connections on this process. Uses `DashMap`
//! so rooms on different shards never contend; no guard is held across an
//! `.await`.
//!
//! Rooms that lose their last connection are announced on a broadcast
//! channel so per-room resources elsewhere can be released.

use super::Connection;
use dashmap::DashMap;
use futures::future::join_all;
use relay_core::Snowflake;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// Default per-connection write timeout
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

const VACATED_BUFFER: usize = 256;

/// Outcome of a room broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the payload was queued for
    pub delivered: usize,
    /// Connections that failed and were unregistered
    pub dropped: usize,
}

/// Room-keyed registry of live connections
pub struct ConnectionRegistry {
    /// Room ID to connections by session ID
    rooms: DashMap<Snowflake, HashMap<String, Arc<Connection>>>,

    /// Session ID to the one room it is bound to
    sessions: DashMap<String, Snowflake>,

    write_timeout: Duration,

    /// Rooms whose last connection was just removed
    vacated: broadcast::Sender<Snowflake>,
}

impl ConnectionRegistry {
    /// Create a new registry
    #[must_use]
    pub fn new(write_timeout: Duration) -> Self {
        Self {
            rooms: DashMap::new(),
            sessions: DashMap::new(),
            write_timeout,
            vacated: broadcast::channel(VACATED_BUFFER).0,
        }
    }

    /// Create a new registry wrapped in Arc
    #[must_use]
    pub fn new_shared(write_timeout: Duration) -> Arc<Self> {
        Arc::new(Self::new(write_timeout))
    }

    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Receive the ID of every room that drops to zero connections
    pub fn subscribe_vacated(&self) -> broadcast::Receiver<Snowflake> {
        self.vacated.subscribe()
    }

    /// Bind a connection to a room.
    ///
    /// A connection lives in at most one room; registering it somewhere else
    /// first removes it from the previous room.
    pub fn register(&self, room_id: Snowflake, connection: Arc<Connection>) {
        let session_id = connection.session_id().to_string();

        if let Some(previous) = self.sessions.insert(session_id.clone(), room_id) {
            if previous != room_id {
                self.remove_from_room(previous, &session_id);
                debug!(session_id = %session_id, from = %previous, to = %room_id, "Connection moved rooms");
            }
        }

        self.rooms
            .entry(room_id)
            .or_default()
            .insert(session_id.clone(), connection);

        debug!(session_id = %session_id, room_id = %room_id, "Connection registered");
    }

    /// Remove a connection from a room; returns whether it was registered there
    pub fn unregister(&self, room_id: Snowflake, session_id: &str) -> bool {
        let removed = self.remove_from_room(room_id, session_id);
        self.sessions
            .remove_if(session_id, |_, bound| *bound == room_id);

        if removed {
            debug!(session_id = %session_id, room_id = %room_id, "Connection unregistered");
        }
        removed
    }

    /// Remove a connection from whatever room it is in (disconnect cleanup)
    pub fn unregister_connection(&self, session_id: &str) -> Option<Snowflake> {
        let (_, room_id) = self.sessions.remove(session_id)?;
        self.remove_from_room(room_id, session_id);

        debug!(session_id = %session_id, room_id = %room_id, "Connection removed");
        Some(room_id)
    }

    fn remove_from_room(&self, room_id: Snowflake, session_id: &str) -> bool {
        let removed = self
            .rooms
            .get_mut(&room_id)
            .is_some_and(|mut connections| connections.remove(session_id).is_some());

        // Drop empty rooms so room_count only reflects rooms with live clients
        if self
            .rooms
            .remove_if(&room_id, |_, connections| connections.is_empty())
            .is_some()
        {
            // No receivers is fine
            let _ = self.vacated.send(room_id);
            trace!(room_id = %room_id, "Room vacated");
        }

        removed
    }

    /// Snapshot of a room's connections
    pub fn room_connections(&self, room_id: Snowflake) -> Vec<Arc<Connection>> {
        self.rooms
            .get(&room_id)
            .map(|connections| connections.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Deliver `payload` to every connection registered for the room.
    ///
    /// Writes run concurrently, each bounded by the write timeout. A closed
    /// or timed-out connection is unregistered and closed, and the rest still
    /// receive the payload. Nothing is retried.
    pub async fn broadcast(&self, room_id: Snowflake, payload: Arc<str>) -> BroadcastReport {
        let targets = self.room_connections(room_id);
        if targets.is_empty() {
            return BroadcastReport::default();
        }

        let results = join_all(targets.iter().map(|connection| {
            let payload = Arc::clone(&payload);
            async move {
                connection
                    .send_timeout(payload, self.write_timeout)
                    .await
            }
        }))
        .await;

        let mut report = BroadcastReport::default();
        for (connection, result) in targets.iter().zip(results) {
            match result {
                Ok(()) => report.delivered += 1,
                Err(failure) => {
                    report.dropped += 1;
                    self.unregister(room_id, connection.session_id());
                    connection.close();
                    warn!(
                        room_id = %room_id,
                        session_id = %connection.session_id(),
                        reason = %failure,
                        "Dropping connection after failed write"
                    );
                }
            }
        }

        trace!(
            room_id = %room_id,
            delivered = report.delivered,
            dropped = report.dropped,
            "Broadcast complete"
        );

        report
    }

    /// Number of connections in a room
    pub fn room_connection_count(&self, room_id: Snowflake) -> usize {
        self.rooms.get(&room_id).map_or(0, |c| c.len())
    }

    /// Number of rooms with at least one live connection
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Total number of registered connections
    pub fn connection_count(&self) -> usize {
        self.sessions.len()
    }

    /// Room a session is bound to
    pub fn room_of(&self, session_id: &str) -> Option<Snowflake> {
        self.sessions.get(session_id).map(|room| *room)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_WRITE_TIMEOUT)
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("rooms", &self.rooms.len())
            .field("connections", &self.sessions.len())
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    const ROOM: Snowflake = Snowflake::new(100);
    const OTHER_ROOM: Snowflake = Snowflake::new(200);

    fn connection(session: &str, buffer: usize) -> (Arc<Connection>, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Connection::new(session, Snowflake::new(1), tx), rx)
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let registry = ConnectionRegistry::default();
        let (c1, _rx1) = connection("c1", 8);

        registry.register(ROOM, c1);
        assert_eq!(registry.room_connection_count(ROOM), 1);
        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.room_of("c1"), Some(ROOM));

        assert!(!registry.unregister(OTHER_ROOM, "c1"));
        assert!(registry.unregister(ROOM, "c1"));
        assert_eq!(registry.room_count(), 0);
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_registering_elsewhere_moves_the_connection() {
        let registry = ConnectionRegistry::default();
        let (c1, _rx1) = connection("c1", 8);

        registry.register(ROOM, c1.clone());
        registry.register(OTHER_ROOM, c1);

        assert_eq!(registry.room_connection_count(ROOM), 0);
        assert_eq!(registry.room_connection_count(OTHER_ROOM), 1);
        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.room_count(), 1);
    }

    #[tokio::test]
    async fn test_unregister_connection_without_room() {
        let registry = ConnectionRegistry::default();
        let (c1, _rx1) = connection("c1", 8);
        let (c2, _rx2) = connection("c2", 8);
        registry.register(ROOM, c1);
        registry.register(ROOM, c2);

        assert_eq!(registry.unregister_connection("c1"), Some(ROOM));
        assert_eq!(registry.unregister_connection("c1"), None);
        assert_eq!(registry.room_connection_count(ROOM), 1);
    }

    #[tokio::test]
    async fn test_broadcast_skips_a_closed_connection() {
        let registry = ConnectionRegistry::default();
        let (c1, rx1) = connection("c1", 8);
        let (c2, mut rx2) = connection("c2", 8);
        registry.register(ROOM, c1);
        registry.register(ROOM, c2);
        drop(rx1);

        let report = registry.broadcast(ROOM, Arc::from("{\"type\":\"X\"}")).await;

        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 1 });
        assert_eq!(rx2.recv().await.as_deref(), Some("{\"type\":\"X\"}"));
        assert_eq!(registry.room_connection_count(ROOM), 1);
        assert_eq!(registry.room_of("c1"), None);
    }

    #[tokio::test]
    async fn test_broadcast_drops_a_stalled_connection() {
        let registry = ConnectionRegistry::new(Duration::from_millis(20));
        let (slow, _slow_rx) = connection("slow", 1);
        let (fast, mut fast_rx) = connection("fast", 8);
        slow.try_send(Arc::from("backlog")).unwrap();
        registry.register(ROOM, Arc::clone(&slow));
        registry.register(ROOM, Arc::clone(&fast));

        let report = registry.broadcast(ROOM, Arc::from("next")).await;

        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(fast_rx.recv().await.as_deref(), Some("next"));
        assert_eq!(registry.room_of("slow"), None);
        assert!(slow.is_evicted());
        assert!(slow.is_closed());
        assert!(!fast.is_closed());
    }

    #[tokio::test]
    async fn test_emptied_room_is_announced() {
        let registry = ConnectionRegistry::default();
        let mut vacated = registry.subscribe_vacated();
        let (c1, _rx1) = connection("c1", 8);
        let (c2, _rx2) = connection("c2", 8);
        registry.register(ROOM, c1.clone());
        registry.register(ROOM, c2);

        registry.unregister_connection("c2");
        assert!(vacated.try_recv().is_err());

        // Moving the last connection out empties the room too
        registry.register(OTHER_ROOM, c1);
        assert_eq!(vacated.try_recv().unwrap(), ROOM);

        registry.unregister(OTHER_ROOM, "c1");
        assert_eq!(vacated.try_recv().unwrap(), OTHER_ROOM);
        assert!(vacated.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_to_empty_room() {
        let registry = ConnectionRegistry::default();
        let report = registry.broadcast(ROOM, Arc::from("nobody")).await;
        assert_eq!(report, BroadcastReport::default());
    }

    #[tokio::test]
    async fn test_broadcast_is_scoped_to_the_room() {
        let registry = ConnectionRegistry::default();
        let (c1, mut rx1) = connection("c1", 8);
        let (c2, mut rx2) = connection("c2", 8);
        registry.register(ROOM, c1);
        registry.register(OTHER_ROOM, c2);

        registry.broadcast(ROOM, Arc::from("only room 100")).await;

        assert_eq!(rx1.recv().await.as_deref(), Some("only room 100"));
        assert!(rx2.try_recv().is_err());
    }
}
