//! Redis Pub/Sub publisher.
//!
//! Publishes room events to their room channel for every server process.

use async_trait::async_trait;
use redis::AsyncCommands;
use relay_core::{EventPublisher, RepoResult, RoomEvent};

use crate::pool::{RedisPool, RedisResult};
use crate::pubsub::RoomChannel;

/// Redis Pub/Sub publisher
#[derive(Clone)]
pub struct Publisher {
    pool: RedisPool,
}

impl Publisher {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Publish an event to the channel of its room
    pub async fn publish_event(&self, event: &RoomEvent) -> RedisResult<u32> {
        let channel = RoomChannel::new(event.room_id());
        let payload = serde_json::to_string(event)?;

        let receivers = self.publish_raw(&channel, &payload).await?;

        tracing::debug!(
            channel = %channel,
            event_type = event.event_name(),
            message_id = %event.message_id(),
            receivers = receivers,
            "Published event"
        );

        Ok(receivers)
    }

    /// Publish a raw payload to a room channel
    pub async fn publish_raw(&self, channel: &RoomChannel, payload: &str) -> RedisResult<u32> {
        let mut conn = self.pool.get().await?;
        let receivers: u32 = conn.publish(channel.name(), payload).await?;
        Ok(receivers)
    }
}

#[async_trait]
impl EventPublisher for Publisher {
    async fn publish(&self, event: &RoomEvent) -> RepoResult<u32> {
        Ok(self.publish_event(event).await?)
    }
}
