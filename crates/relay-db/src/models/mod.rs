//! Database models - SQLx-compatible structs for PostgreSQL tables

mod message;
mod room;

pub use message::ChatMessageModel;
pub use room::ChatRoomModel;
