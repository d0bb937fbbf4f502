//! Data transfer objects for API requests and responses
//!
//! This module provides:
//! - Request DTOs with validation for HTTP and WebSocket inputs
//! - Response DTOs for serializing API outputs
//! - Mappers for converting domain entities to DTOs

pub mod mappers;
pub mod requests;
pub mod responses;

pub use requests::{ListMessagesQuery, OpenRoomRequest, SendImageRequest, SendTextRequest};

pub use responses::{
    AckResponse, ApiResponse, HealthChecks, HealthResponse, MessageResponse, PaginatedResponse,
    PaginationMeta, ReadinessResponse, RoomResponse,
};
