//! Individual WebSocket connection
//!
//! The registry only ever sees this handle: a session id, the member it
//! belongs to, the sending half of the socket's outbound queue and the
//! eviction flag its socket task watches.

use relay_core::Snowflake;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};

/// Why a write to a connection failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendFailure {
    #[error("connection closed")]
    Closed,

    #[error("write timed out")]
    TimedOut,
}

/// A single WebSocket connection bound to one member
pub struct Connection {
    /// Unique session ID
    session_id: String,

    /// Member on the other end
    member_id: Snowflake,

    /// Outbound queue drained by the socket writer task
    sender: mpsc::Sender<Arc<str>>,

    /// Set once the registry gives up on this connection
    evicted: watch::Sender<bool>,

    created_at: Instant,
}

impl Connection {
    /// Create a new connection
    pub fn new(
        session_id: impl Into<String>,
        member_id: Snowflake,
        sender: mpsc::Sender<Arc<str>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            session_id: session_id.into(),
            member_id,
            sender,
            evicted: watch::channel(false).0,
            created_at: Instant::now(),
        })
    }

    /// Generate a fresh session ID
    pub fn generate_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn member_id(&self) -> Snowflake {
        self.member_id
    }

    /// Queue a frame, waiting at most `timeout` for buffer space
    pub async fn send_timeout(&self, frame: Arc<str>, timeout: Duration) -> Result<(), SendFailure> {
        self.sender
            .send_timeout(frame, timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Closed(_) => SendFailure::Closed,
                SendTimeoutError::Timeout(_) => SendFailure::TimedOut,
            })
    }

    /// Queue a frame without waiting
    pub fn try_send(&self, frame: Arc<str>) -> Result<(), SendFailure> {
        self.sender.try_send(frame).map_err(|e| match e {
            TrySendError::Closed(_) => SendFailure::Closed,
            TrySendError::Full(_) => SendFailure::TimedOut,
        })
    }

    /// Check if the socket writer has gone away or the connection was evicted
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed() || self.is_evicted()
    }

    /// Mark the connection evicted; its socket task closes the socket
    pub fn close(&self) {
        self.evicted.send_replace(true);
    }

    pub fn is_evicted(&self) -> bool {
        *self.evicted.borrow()
    }

    /// Resolves once `close` has been called
    pub async fn evicted(&self) {
        let mut rx = self.evicted.subscribe();
        // The sender lives in `self`, so this only returns once the flag is set
        let _ = rx.wait_for(|evicted| *evicted).await;
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .field("member_id", &self.member_id)
            .field("evicted", &self.is_evicted())
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_creation() {
        let (tx, _rx) = mpsc::channel(10);
        let conn = Connection::new("session123", Snowflake::new(7), tx);

        assert_eq!(conn.session_id(), "session123");
        assert_eq!(conn.member_id(), Snowflake::new(7));
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn test_send_reaches_receiver() {
        let (tx, mut rx) = mpsc::channel(10);
        let conn = Connection::new("s", Snowflake::new(1), tx);

        conn.send_timeout(Arc::from("hello"), Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_send_failures() {
        let (tx, rx) = mpsc::channel(1);
        let conn = Connection::new("s", Snowflake::new(1), tx);

        conn.try_send(Arc::from("fills the buffer")).unwrap();
        let err = conn
            .send_timeout(Arc::from("no room"), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err, SendFailure::TimedOut);

        drop(rx);
        assert!(conn.is_closed());
        let err = conn
            .send_timeout(Arc::from("gone"), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err, SendFailure::Closed);
    }

    #[tokio::test]
    async fn test_close_wakes_the_socket_task() {
        let (tx, _rx) = mpsc::channel(10);
        let conn = Connection::new("s", Snowflake::new(1), tx);

        let waiter = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.evicted().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        conn.close();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("eviction observed in time")
            .unwrap();
        assert!(conn.is_evicted());
        assert!(conn.is_closed());

        // Already evicted: resolves immediately
        tokio::time::timeout(Duration::from_millis(50), conn.evicted())
            .await
            .unwrap();
    }

    #[test]
    fn test_session_ids_are_unique() {
        let id1 = Connection::generate_session_id();
        let id2 = Connection::generate_session_id();

        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 36);
    }
}
