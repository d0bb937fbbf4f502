//! # relay-bus
//!
//! Redis message bus for relaying room events across server processes.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Room Channels**: `chatroom-{id}` naming and the `chatroom-*` pattern
//! - **Pub/Sub**: Event publishing and a reconnecting pattern subscriber
//! - **Supervisor**: Bounded connectivity check before the server starts
//!
//! ## Example
//!
//! ```ignore
//! use relay_bus::{BusSupervisor, Publisher, RedisPool, RetryPolicy, SubscriberBuilder};
//!
//! let pool = RedisPool::from_config(&config.redis)?;
//! BusSupervisor::new(RetryPolicy::default()).wait_until_ready(&pool).await?;
//!
//! let publisher = Publisher::new(pool.clone());
//! publisher.publish(&RoomEvent::message_created(&message)).await?;
//!
//! let subscriber = SubscriberBuilder::new()
//!     .redis_url(config.redis.url())
//!     .psubscribe(ROOM_CHANNEL_PATTERN)
//!     .build();
//! ```

pub mod pool;
pub mod pubsub;
pub mod supervisor;

// Re-export pool types
pub use pool::{create_shared_pool, RedisPool, RedisPoolConfig, RedisPoolError, RedisResult, SharedRedisPool};

// Re-export pubsub types
pub use pubsub::{
    Publisher, ReceivedMessage, RoomChannel, Subscriber, SubscriberBuilder, SubscriberConfig,
    SubscriberError, SubscriberResult, ROOM_CHANNEL_PATTERN, ROOM_CHANNEL_PREFIX,
};

// Re-export supervisor types
pub use supervisor::{BusProbe, BusSupervisor, RetryPolicy, SupervisorError};
