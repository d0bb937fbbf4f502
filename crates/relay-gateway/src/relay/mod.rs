//! Inbound relay
//!
//! Receives room events from the bus and hands them to the connection
//! registry, one ordered delivery lane per room.

mod inbound;

pub use inbound::{DispatchOutcome, InboundRelay, RelayError, DEFAULT_LANE_BUFFER};
