//! Entity <-> Model mappers

mod message;
mod room;

pub use message::MessageInsert;
pub use room::member_key;
