//! WebSocket protocol
//!
//! Client frames are `type`-tagged JSON. The server writes bus events
//! verbatim plus its own `ERROR` and `PONG` frames.

mod frames;

pub use frames::{ClientFrame, ServerFrame};
