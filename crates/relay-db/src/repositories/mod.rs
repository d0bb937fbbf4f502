//! Repository implementations
//!
//! PostgreSQL implementations of the store ports defined in relay-core.

mod error;
mod message;
mod room;

pub use message::PgMessageStore;
pub use room::PgRoomRepository;
