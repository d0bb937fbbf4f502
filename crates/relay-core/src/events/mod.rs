//! Events carried on the room channels of the message bus

mod room_event;

pub use room_event::{MessageCreatedPayload, MessageStatusPayload, RoomEvent};
