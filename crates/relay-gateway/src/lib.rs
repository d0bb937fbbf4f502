//! # relay-gateway
//!
//! HTTP and WebSocket front end of the chat room relay.
//!
//! Messages sent through this process are persisted and published to the
//! room's bus channel; every gateway process subscribes to all room channels
//! and fans events out to the sockets it holds locally.

pub mod connection;
pub mod extractors;
pub mod handlers;
pub mod protocol;
pub mod relay;
pub mod response;
pub mod server;

pub use server::{create_app, create_gateway_state, run, GatewayState};
