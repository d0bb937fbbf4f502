//! Entity to DTO mappers
//!
//! Implements `From` conversions from domain entities to response DTOs.

use relay_core::{AckOutcome, ChatMessage, ChatRoom};

use super::responses::{AckResponse, MessageResponse, RoomResponse};

impl From<&ChatRoom> for RoomResponse {
    fn from(room: &ChatRoom) -> Self {
        Self {
            id: room.id.to_string(),
            member_ids: room.member_ids.iter().map(ToString::to_string).collect(),
            created_at: room.timestamps.created_at,
            updated_at: room.timestamps.updated_at,
        }
    }
}

impl From<ChatRoom> for RoomResponse {
    fn from(room: ChatRoom) -> Self {
        Self::from(&room)
    }
}

impl From<&ChatMessage> for MessageResponse {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id.to_string(),
            room_id: message.room_id.to_string(),
            sender_id: message.sender_id.to_string(),
            message_type: message.message_type(),
            content: message.content.as_text().map(str::to_owned),
            image_url: message.content.image_url().map(str::to_owned),
            status: message.status,
            unread_count: message.unread_count,
            created_at: message.timestamps.created_at,
            updated_at: message.timestamps.updated_at,
        }
    }
}

impl From<ChatMessage> for MessageResponse {
    fn from(message: ChatMessage) -> Self {
        Self::from(&message)
    }
}

impl From<AckOutcome> for AckResponse {
    fn from(outcome: AckOutcome) -> Self {
        Self {
            message_id: outcome.message_id.to_string(),
            room_id: outcome.room_id.to_string(),
            status: outcome.status,
            unread_count: outcome.unread_count,
            updated_at: outcome.updated_at,
            changed: outcome.changed,
        }
    }
}
