//! # relay-service
//!
//! Application layer: the outbound publisher (persist, then publish), the
//! unread tracker, room use cases, and the DTOs the HTTP and WebSocket
//! surfaces exchange.

pub mod dto;
pub mod services;

pub use services::{
    MessageService, RoomService, ServiceContext, ServiceContextBuilder, ServiceError,
    ServiceResult, UnreadTracker,
};

pub use dto::{
    AckResponse, HealthResponse, ListMessagesQuery, MessageResponse, OpenRoomRequest,
    PaginatedResponse, ReadinessResponse, RoomResponse, SendImageRequest, SendTextRequest,
};
