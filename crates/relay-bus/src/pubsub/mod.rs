//! Redis Pub/Sub module.
//!
//! Room channel naming, event publishing, and the pattern subscriber.

mod channels;
mod publisher;
mod subscriber;

pub use channels::{RoomChannel, ROOM_CHANNEL_PATTERN, ROOM_CHANNEL_PREFIX};
pub use publisher::Publisher;
pub use subscriber::{
    ReceivedMessage, Subscriber, SubscriberBuilder, SubscriberConfig, SubscriberError,
    SubscriberResult,
};
