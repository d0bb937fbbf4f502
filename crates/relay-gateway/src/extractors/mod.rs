//! Axum extractors for request handling

mod identity;
mod path;
mod validated;

pub use identity::{MemberIdentity, MEMBER_ID_HEADER};
pub use path::{MessageIdPath, RoomIdPath};
pub use validated::ValidatedJson;
