//! Ports - interfaces the infrastructure layer implements

mod publisher;
mod repositories;

pub use publisher::EventPublisher;
pub use repositories::{MessageQuery, MessageStore, RepoResult, RoomRepository};
