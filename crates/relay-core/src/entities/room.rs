//! Chat room entity - a fixed group of members sharing one message stream

use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::value_objects::{Snowflake, Timestamps};

/// Chat room entity
///
/// `member_ids` is kept sorted and de-duplicated so two rooms with the same
/// participants compare equal regardless of the order they were opened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRoom {
    pub id: Snowflake,
    pub member_ids: Vec<Snowflake>,
    pub timestamps: Timestamps,
}

impl ChatRoom {
    /// Minimum number of distinct members in a room
    pub const MIN_MEMBERS: usize = 2;

    /// Create a new room; fails with `InvalidRoomMembers` for fewer than two distinct members
    pub fn new(
        id: Snowflake,
        members: impl IntoIterator<Item = Snowflake>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let member_ids = Self::normalize_members(members);
        if member_ids.len() < Self::MIN_MEMBERS {
            return Err(DomainError::InvalidRoomMembers(format!(
                "a room needs at least {} distinct members, got {}",
                Self::MIN_MEMBERS,
                member_ids.len()
            )));
        }

        Ok(Self {
            id,
            member_ids,
            timestamps: Timestamps::at(now),
        })
    }

    /// Sort and de-duplicate a member list
    pub fn normalize_members(members: impl IntoIterator<Item = Snowflake>) -> Vec<Snowflake> {
        let mut ids: Vec<Snowflake> = members.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    #[inline]
    pub fn is_member(&self, member_id: Snowflake) -> bool {
        self.member_ids.binary_search(&member_id).is_ok()
    }

    #[inline]
    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }

    /// Number of members other than the sender of a message
    #[inline]
    pub fn recipient_count(&self) -> u32 {
        u32::try_from(self.member_ids.len().saturating_sub(1)).unwrap_or(u32::MAX)
    }

    /// Members who receive a message from `sender_id`
    pub fn recipients_of(&self, sender_id: Snowflake) -> impl Iterator<Item = Snowflake> + '_ {
        self.member_ids
            .iter()
            .copied()
            .filter(move |id| *id != sender_id)
    }

    /// Fail with `AccessDenied` unless `member_id` belongs to this room
    pub fn ensure_member(&self, member_id: Snowflake) -> Result<(), DomainError> {
        if self.is_member(member_id) {
            Ok(())
        } else {
            Err(DomainError::AccessDenied {
                room_id: self.id,
                member_id,
            })
        }
    }
}
