//! Business logic services
//!
//! Each service borrows the [`ServiceContext`] and orchestrates domain
//! operations over the store, the room repository and the event publisher.

pub mod context;
pub mod error;
pub mod message;
pub mod room;
pub mod unread;

pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use message::MessageService;
pub use room::RoomService;
pub use unread::UnreadTracker;
