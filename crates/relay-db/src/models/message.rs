//! Chat message database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Row of `chat_messages` plus the ids of members that acknowledged it
#[derive(Debug, Clone, FromRow)]
pub struct ChatMessageModel {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub message_type: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub unread_count: i32,
    pub status: String,
    pub acknowledged_by: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatMessageModel {
    #[inline]
    pub fn is_image(&self) -> bool {
        self.message_type == "IMAGE"
    }
}
