//! Room events - the self-describing JSON envelope published per room
//!
//! Every process that has live connections for a room receives these from
//! the bus and forwards them verbatim to its clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{AckOutcome, ChatMessage, MessageContent, MessageType};
use crate::error::DomainError;
use crate::value_objects::{MessageStatus, Snowflake};

/// All events published on a room channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomEvent {
    MessageCreate(MessageCreatedPayload),
    MessageStatusUpdate(MessageStatusPayload),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCreatedPayload {
    pub id: Snowflake,
    pub room_id: Snowflake,
    pub sender_id: Snowflake,
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub status: MessageStatus,
    pub unread_count: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStatusPayload {
    pub id: Snowflake,
    pub room_id: Snowflake,
    pub sender_id: Snowflake,
    pub status: MessageStatus,
    pub unread_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomEvent {
    /// Event announcing a freshly persisted message
    pub fn message_created(message: &ChatMessage) -> Self {
        let (content, image_url) = match &message.content {
            MessageContent::Text(text) => (Some(text.clone()), None),
            MessageContent::Image { image_url } => (None, Some(image_url.clone())),
        };

        Self::MessageCreate(MessageCreatedPayload {
            id: message.id,
            room_id: message.room_id,
            sender_id: message.sender_id,
            message_type: message.message_type(),
            content,
            image_url,
            status: message.status,
            unread_count: message.unread_count,
            created_at: message.timestamps.created_at,
        })
    }

    /// Event announcing a new unread count or status
    pub fn status_updated(outcome: &AckOutcome) -> Self {
        Self::MessageStatusUpdate(MessageStatusPayload {
            id: outcome.message_id,
            room_id: outcome.room_id,
            sender_id: outcome.sender_id,
            status: outcome.status,
            unread_count: outcome.unread_count,
            created_at: outcome.created_at,
            updated_at: outcome.updated_at,
        })
    }

    pub fn room_id(&self) -> Snowflake {
        match self {
            Self::MessageCreate(p) => p.room_id,
            Self::MessageStatusUpdate(p) => p.room_id,
        }
    }

    pub fn message_id(&self) -> Snowflake {
        match self {
            Self::MessageCreate(p) => p.id,
            Self::MessageStatusUpdate(p) => p.id,
        }
    }

    /// Get the event type name
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::MessageCreate(_) => "MESSAGE_CREATE",
            Self::MessageStatusUpdate(_) => "MESSAGE_STATUS_UPDATE",
        }
    }

    pub fn to_json(&self) -> Result<String, DomainError> {
        serde_json::to_string(self).map_err(|e| DomainError::InternalError(e.to_string()))
    }

    pub fn from_json(payload: &str) -> Result<Self, DomainError> {
        serde_json::from_str(payload).map_err(|e| DomainError::MalformedPayload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ChatRoom;

    fn sample_message(content: MessageContent) -> ChatMessage {
        let room = ChatRoom::new(
            Snowflake::new(77),
            [Snowflake::new(1), Snowflake::new(2)],
            Utc::now(),
        )
        .unwrap();
        ChatMessage::new(Snowflake::new(5), &room, Snowflake::new(1), content, Utc::now()).unwrap()
    }

    #[test]
    fn test_message_create_wire_shape() {
        let event = RoomEvent::message_created(&sample_message(MessageContent::text("hi")));
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        assert_eq!(value["type"], "MESSAGE_CREATE");
        assert_eq!(value["id"], "5");
        assert_eq!(value["room_id"], "77");
        assert_eq!(value["sender_id"], "1");
        assert_eq!(value["message_type"], "TEXT");
        assert_eq!(value["content"], "hi");
        assert!(value.get("image_url").is_none());
        assert_eq!(value["status"], "PENDING");
        assert_eq!(value["unread_count"], 1);
    }

    #[test]
    fn test_image_event_carries_url() {
        let event = RoomEvent::message_created(&sample_message(MessageContent::image(
            "https://cdn.example.com/p.png",
        )));
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        assert_eq!(value["message_type"], "IMAGE");
        assert_eq!(value["image_url"], "https://cdn.example.com/p.png");
        assert!(value.get("content").is_none());
    }

    #[test]
    fn test_status_update_decodes() {
        let json = r#"{"type":"MESSAGE_STATUS_UPDATE","id":"5","room_id":"77","sender_id":"1","status":"READ","unread_count":0,"created_at":"2025-03-01T09:59:00Z","updated_at":"2025-03-01T10:00:00Z"}"#;
        let event = RoomEvent::from_json(json).unwrap();

        assert_eq!(event.event_name(), "MESSAGE_STATUS_UPDATE");
        assert_eq!(event.room_id(), Snowflake::new(77));
        assert_eq!(event.message_id(), Snowflake::new(5));
    }

    #[test]
    fn test_status_update_wire_shape() {
        let mut message = sample_message(MessageContent::text("hi"));
        let outcome = message.acknowledge(Snowflake::new(2), Utc::now());
        let value: serde_json::Value =
            serde_json::from_str(&RoomEvent::status_updated(&outcome).to_json().unwrap()).unwrap();

        assert_eq!(value["type"], "MESSAGE_STATUS_UPDATE");
        assert_eq!(value["id"], "5");
        assert_eq!(value["room_id"], "77");
        assert_eq!(value["sender_id"], "1");
        assert_eq!(value["status"], "READ");
        assert_eq!(value["unread_count"], 0);
        assert!(value["created_at"].is_string());
        assert!(value["updated_at"].is_string());
    }

    #[test]
    fn test_malformed_payload() {
        let err = RoomEvent::from_json(r#"{"type":"SOMETHING_ELSE"}"#).unwrap_err();
        assert!(matches!(err, DomainError::MalformedPayload(_)));
        assert!(RoomEvent::from_json("not json").is_err());
    }
}
