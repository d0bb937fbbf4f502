//! Request DTOs for API endpoints
//!
//! All request DTOs implement `Deserialize` and `Validate` for input validation.
//! Snowflake IDs are accepted either as JSON strings or numbers.

use relay_core::traits::MessageQuery;
use relay_core::Snowflake;
use serde::Deserialize;
use validator::Validate;

// ============================================================================
// Room Requests
// ============================================================================

/// Open (or reopen) a room with the given members.
///
/// The caller is always part of the room, so listing one other member is
/// enough for a two-person conversation.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OpenRoomRequest {
    #[validate(length(min = 1, max = 100, message = "member_ids must list 1-100 members"))]
    pub member_ids: Vec<Snowflake>,
}

// ============================================================================
// Message Requests
// ============================================================================

/// Send a text message
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendTextRequest {
    #[validate(length(min = 1, max = 2000, message = "Message content must be 1-2000 characters"))]
    pub content: String,
}

/// Send an image message whose file was already uploaded to object storage
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendImageRequest {
    #[validate(length(min = 1, max = 2048, message = "image_url must be 1-2048 characters"))]
    pub image_url: String,
}

/// Message history query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListMessagesQuery {
    pub before: Option<Snowflake>,
    pub after: Option<Snowflake>,
    pub limit: Option<i64>,
}

impl From<ListMessagesQuery> for MessageQuery {
    fn from(query: ListMessagesQuery) -> Self {
        MessageQuery::new(query.before, query.after, query.limit)
    }
}
