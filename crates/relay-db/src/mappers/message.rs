//! Chat message entity <-> model mapper

use relay_core::entities::{ChatMessage, MessageContent, MessageType};
use relay_core::error::DomainError;
use relay_core::value_objects::{MessageStatus, Snowflake, Timestamps};

use crate::models::ChatMessageModel;

/// Convert ChatMessageModel to ChatMessage entity.
///
/// Fails only on rows that violate the schema's own constraints.
impl TryFrom<ChatMessageModel> for ChatMessage {
    type Error = DomainError;

    fn try_from(model: ChatMessageModel) -> Result<Self, Self::Error> {
        let message_type: MessageType = model
            .message_type
            .parse()
            .map_err(DomainError::DatabaseError)?;
        let status: MessageStatus = model.status.parse().map_err(DomainError::DatabaseError)?;
        let unread_count = u32::try_from(model.unread_count).map_err(|_| {
            DomainError::DatabaseError(format!(
                "negative unread_count {} on message {}",
                model.unread_count, model.id
            ))
        })?;

        Ok(ChatMessage {
            id: Snowflake::new(model.id),
            room_id: Snowflake::new(model.room_id),
            sender_id: Snowflake::new(model.sender_id),
            content: MessageContent::from_parts(message_type, model.content, model.image_url)?,
            unread_count,
            status,
            acknowledged_by: model.acknowledged_by.into_iter().map(Snowflake::new).collect(),
            timestamps: Timestamps {
                created_at: model.created_at,
                updated_at: model.updated_at,
            },
        })
    }
}

/// Column values for inserting a ChatMessage
pub struct MessageInsert<'a> {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub message_type: &'static str,
    pub content: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub unread_count: i32,
    pub status: &'static str,
}

impl<'a> MessageInsert<'a> {
    pub fn new(message: &'a ChatMessage) -> Self {
        Self {
            id: message.id.into_inner(),
            room_id: message.room_id.into_inner(),
            sender_id: message.sender_id.into_inner(),
            message_type: message.message_type().as_str(),
            content: message.content.as_text(),
            image_url: message.content.image_url(),
            unread_count: i32::try_from(message.unread_count).unwrap_or(i32::MAX),
            status: message.status.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn model() -> ChatMessageModel {
        let now = Utc::now();
        ChatMessageModel {
            id: 9,
            room_id: 3,
            sender_id: 1,
            message_type: "IMAGE".to_string(),
            content: None,
            image_url: Some("https://cdn.example.com/cat.png".to_string()),
            unread_count: 1,
            status: "SENT".to_string(),
            acknowledged_by: vec![2],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_model_to_entity() {
        let message = ChatMessage::try_from(model()).unwrap();
        assert_eq!(message.message_type(), MessageType::Image);
        assert_eq!(message.content.image_url(), Some("https://cdn.example.com/cat.png"));
        assert_eq!(message.status, MessageStatus::Sent);
        assert!(message.has_acknowledged(Snowflake::new(2)));

        let insert = MessageInsert::new(&message);
        assert_eq!(insert.message_type, "IMAGE");
        assert_eq!(insert.content, None);
        assert_eq!(insert.status, "SENT");
    }

    #[test]
    fn test_corrupt_rows_are_rejected() {
        let mut bad_status = model();
        bad_status.status = "DELIVERED".to_string();
        assert!(ChatMessage::try_from(bad_status).is_err());

        let mut negative = model();
        negative.unread_count = -1;
        assert!(ChatMessage::try_from(negative).is_err());
    }
}
