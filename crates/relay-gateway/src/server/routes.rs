//! Route configuration

use axum::{
    routing::{get, post},
    Router,
};

use super::GatewayState;
use crate::handlers::{health, messages, rooms, ws};

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .nest("/api/v1", api_routes())
        .route("/ws/rooms/:room_id", get(ws::room_socket))
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}

fn api_routes() -> Router<GatewayState> {
    Router::new()
        .route("/rooms", post(rooms::open_room))
        .route("/rooms/:room_id", get(rooms::get_room))
        .route(
            "/rooms/:room_id/messages",
            get(messages::list_messages).post(messages::send_text),
        )
        .route("/rooms/:room_id/images", post(messages::send_image))
        .route("/messages/:message_id", get(messages::get_message))
        .route("/messages/:message_id/ack", post(messages::acknowledge))
}
