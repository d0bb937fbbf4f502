//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{AckOutcome, ChatMessage, ChatRoom};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Room Repository
// ============================================================================

#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Find room by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<ChatRoom>>;

    /// Find the room whose member set is exactly `member_ids` (normalized)
    async fn find_by_members(&self, member_ids: &[Snowflake]) -> RepoResult<Option<ChatRoom>>;

    /// Create a new room together with its membership rows
    async fn create(&self, room: &ChatRoom) -> RepoResult<()>;

    /// Check if member belongs to room
    async fn is_member(&self, room_id: Snowflake, member_id: Snowflake) -> RepoResult<bool>;
}

// ============================================================================
// Message Store
// ============================================================================

/// Pagination options for message queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageQuery {
    pub before: Option<Snowflake>,
    pub after: Option<Snowflake>,
    pub limit: i64,
}

impl MessageQuery {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 100;

    /// Build a query with the limit clamped to `1..=MAX_LIMIT`
    pub fn new(before: Option<Snowflake>, after: Option<Snowflake>, limit: Option<i64>) -> Self {
        Self {
            before,
            after,
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }
}

impl Default for MessageQuery {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

/// Durable message store.
///
/// `acknowledge` and `mark_delivered` are read-modify-write operations and
/// must be atomic per message. Implementations load the message, apply the
/// matching [`ChatMessage`] transition and persist the result.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message
    async fn create(&self, message: &ChatMessage) -> RepoResult<()>;

    /// Find message by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<ChatMessage>>;

    /// List messages in a room, newest first (oldest first when paging with `after`)
    async fn find_by_room(&self, room_id: Snowflake, query: MessageQuery)
        -> RepoResult<Vec<ChatMessage>>;

    /// Record a read acknowledgement; `MessageNotFound` for unknown IDs
    async fn acknowledge(
        &self,
        message_id: Snowflake,
        recipient_id: Snowflake,
        now: DateTime<Utc>,
    ) -> RepoResult<AckOutcome>;

    /// Record a delivery confirmation; `MessageNotFound` for unknown IDs
    async fn mark_delivered(
        &self,
        message_id: Snowflake,
        recipient_id: Snowflake,
        now: DateTime<Utc>,
    ) -> RepoResult<AckOutcome>;
}
