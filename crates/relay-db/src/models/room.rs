//! Chat room database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Row of `chat_rooms` joined with its aggregated members
#[derive(Debug, Clone, FromRow)]
pub struct ChatRoomModel {
    pub id: i64,
    pub member_key: String,
    pub member_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
