//! Event publisher port

use async_trait::async_trait;

use super::RepoResult;
use crate::events::RoomEvent;

/// Publishes room events to every server process.
///
/// Implementations route each event to the channel of `event.room_id()`.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event; returns the number of subscribers that received it
    async fn publish(&self, event: &RoomEvent) -> RepoResult<u32>;
}
