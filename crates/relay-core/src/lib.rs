//! # relay-core
//!
//! Domain layer for the chat room relay: rooms, chat messages, the
//! delivery status state machine, the bus event envelope, and the ports
//! (store, room repository, event publisher) the application layer depends on.
//! This crate has zero dependencies on infrastructure (database, broker, web framework).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{AckOutcome, ChatMessage, ChatRoom, MessageContent, MessageType};
pub use error::DomainError;
pub use events::{MessageCreatedPayload, MessageStatusPayload, RoomEvent};
pub use traits::{EventPublisher, MessageQuery, MessageStore, RepoResult, RoomRepository};
pub use value_objects::{
    MessageStatus, Snowflake, SnowflakeGenerator, SnowflakeParseError, Timestamps,
};
