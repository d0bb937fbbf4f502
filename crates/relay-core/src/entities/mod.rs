//! Domain entities - core business objects

mod message;
mod room;

pub use message::{AckOutcome, ChatMessage, MessageContent, MessageType, MAX_TEXT_LENGTH};
pub use room::ChatRoom;
