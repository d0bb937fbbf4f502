//! Chat room entity <-> model mapper

use relay_core::entities::ChatRoom;
use relay_core::value_objects::{Snowflake, Timestamps};

use crate::models::ChatRoomModel;

/// Canonical key of a member set: sorted, de-duplicated, comma separated
pub fn member_key(member_ids: &[Snowflake]) -> String {
    ChatRoom::normalize_members(member_ids.iter().copied())
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Convert ChatRoomModel to ChatRoom entity
impl From<ChatRoomModel> for ChatRoom {
    fn from(model: ChatRoomModel) -> Self {
        ChatRoom {
            id: Snowflake::new(model.id),
            member_ids: ChatRoom::normalize_members(model.member_ids.into_iter().map(Snowflake::new)),
            timestamps: Timestamps {
                created_at: model.created_at,
                updated_at: model.updated_at,
            },
        }
    }
}
