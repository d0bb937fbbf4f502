//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::{MessageStatus, Snowflake};

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Chat room not found: {0}")]
    RoomNotFound(Snowflake),

    #[error("Message not found: {0}")]
    MessageNotFound(Snowflake),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Content too long: max {max} characters")]
    ContentTooLong { max: usize },

    #[error("Invalid image URL: {0}")]
    InvalidImageUrl(String),

    #[error("Invalid room members: {0}")]
    InvalidRoomMembers(String),

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("Member {member_id} is not a member of room {room_id}")]
    AccessDenied {
        room_id: Snowflake,
        member_id: Snowflake,
    },

    // =========================================================================
    // State Machine Violations
    // =========================================================================
    #[error("Illegal status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: MessageStatus,
        to: MessageStatus,
    },

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Storage error: {0}")]
    DatabaseError(String),

    #[error("Message bus unavailable: {0}")]
    BusUnavailable(String),

    #[error("Malformed bus payload: {0}")]
    MalformedPayload(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::RoomNotFound(_) => "UNKNOWN_ROOM",
            Self::MessageNotFound(_) => "UNKNOWN_MESSAGE",

            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::ContentTooLong { .. } => "CONTENT_TOO_LONG",
            Self::InvalidImageUrl(_) => "INVALID_IMAGE_URL",
            Self::InvalidRoomMembers(_) => "INVALID_ROOM_MEMBERS",

            Self::AccessDenied { .. } => "ACCESS_DENIED",

            Self::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",

            Self::DatabaseError(_) => "STORAGE_ERROR",
            Self::BusUnavailable(_) => "BUS_UNAVAILABLE",
            Self::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RoomNotFound(_) | Self::MessageNotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::ContentTooLong { .. }
                | Self::InvalidImageUrl(_)
                | Self::InvalidRoomMembers(_)
        )
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::InvalidStatusTransition { .. })
    }

    /// Storage or bus outage rather than a caller mistake
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::BusUnavailable(_))
    }
}
