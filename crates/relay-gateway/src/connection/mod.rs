//! Connection management
//!
//! Live WebSocket connections and the room-keyed registry the relay
//! broadcasts through.

mod connection;
mod registry;

pub use connection::{Connection, SendFailure};
pub use registry::{BroadcastReport, ConnectionRegistry};
