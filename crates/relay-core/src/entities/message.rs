//! Chat message entity and its delivery/unread state machine

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ChatRoom;
use crate::error::DomainError;
use crate::value_objects::{MessageStatus, Snowflake, Timestamps};

/// Maximum length of a text message, in characters
pub const MAX_TEXT_LENGTH: usize = 2000;

/// Kind of payload a message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Text,
    Image,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TEXT" => Ok(Self::Text),
            "IMAGE" => Ok(Self::Image),
            other => Err(format!("unknown message type: {other}")),
        }
    }
}

/// Message body: free text, or the URL of an already uploaded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    Image { image_url: String },
}

impl MessageContent {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn image(image_url: impl Into<String>) -> Self {
        Self::Image {
            image_url: image_url.into(),
        }
    }

    /// Rebuild content from its flattened storage/wire form
    pub fn from_parts(
        message_type: MessageType,
        content: Option<String>,
        image_url: Option<String>,
    ) -> Result<Self, DomainError> {
        match (message_type, content, image_url) {
            (MessageType::Text, Some(text), _) => Ok(Self::Text(text)),
            (MessageType::Image, _, Some(image_url)) => Ok(Self::Image { image_url }),
            (kind, _, _) => Err(DomainError::ValidationError(format!(
                "{kind} message is missing its body"
            ))),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Text(_) => MessageType::Text,
            Self::Image { .. } => MessageType::Image,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Image { .. } => None,
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            Self::Text(_) => None,
            Self::Image { image_url } => Some(image_url),
        }
    }

    /// Check the body before anything is persisted
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Self::Text(text) => {
                if text.trim().is_empty() {
                    return Err(DomainError::ValidationError(
                        "message content must not be blank".to_string(),
                    ));
                }
                if text.chars().count() > MAX_TEXT_LENGTH {
                    return Err(DomainError::ContentTooLong {
                        max: MAX_TEXT_LENGTH,
                    });
                }
                Ok(())
            }
            Self::Image { image_url } => {
                let url = image_url.trim();
                if url.is_empty() {
                    return Err(DomainError::InvalidImageUrl(
                        "image URL must not be blank".to_string(),
                    ));
                }
                let rest = url
                    .strip_prefix("https://")
                    .or_else(|| url.strip_prefix("http://"));
                match rest {
                    Some(host_and_path) if !host_and_path.is_empty() => Ok(()),
                    _ => Err(DomainError::InvalidImageUrl(url.to_string())),
                }
            }
        }
    }
}

/// Result of an acknowledgement or delivery confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckOutcome {
    pub message_id: Snowflake,
    pub room_id: Snowflake,
    pub sender_id: Snowflake,
    pub unread_count: u32,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// False when the call was a no-op (duplicate, sender, already read)
    pub changed: bool,
}

/// Chat message entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: Snowflake,
    pub room_id: Snowflake,
    pub sender_id: Snowflake,
    pub content: MessageContent,
    pub unread_count: u32,
    pub status: MessageStatus,
    pub acknowledged_by: BTreeSet<Snowflake>,
    pub timestamps: Timestamps,
}

impl ChatMessage {
    /// Create a new pending message addressed to every other member of `room`
    pub fn new(
        id: Snowflake,
        room: &ChatRoom,
        sender_id: Snowflake,
        content: MessageContent,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        content.validate()?;
        room.ensure_member(sender_id)?;

        Ok(Self {
            id,
            room_id: room.id,
            sender_id,
            content,
            unread_count: room.recipient_count(),
            status: MessageStatus::Pending,
            acknowledged_by: BTreeSet::new(),
            timestamps: Timestamps::at(now),
        })
    }

    #[inline]
    pub fn message_type(&self) -> MessageType {
        self.content.message_type()
    }

    #[inline]
    pub fn is_read(&self) -> bool {
        self.status.is_terminal()
    }

    #[inline]
    pub fn has_acknowledged(&self, member_id: Snowflake) -> bool {
        self.acknowledged_by.contains(&member_id)
    }

    /// Move the status forward. Backward or repeated transitions are rejected.
    pub fn transition_to(
        &mut self,
        next: MessageStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.timestamps.touch(now);
        Ok(())
    }

    /// A live recipient received the message: `PENDING -> SENT`, count untouched
    pub fn mark_delivered(&mut self, recipient_id: Snowflake, now: DateTime<Utc>) -> AckOutcome {
        if recipient_id == self.sender_id || self.status != MessageStatus::Pending {
            return self.outcome(false);
        }

        let changed = self.transition_to(MessageStatus::Sent, now).is_ok();
        self.outcome(changed)
    }

    /// A recipient read the message.
    ///
    /// Decrements `unread_count` once per distinct recipient; the last one
    /// moves the message to `READ`. Acks from the sender, repeated acks and
    /// acks after `READ` leave the message untouched.
    pub fn acknowledge(&mut self, recipient_id: Snowflake, now: DateTime<Utc>) -> AckOutcome {
        if recipient_id == self.sender_id
            || self.is_read()
            || self.unread_count == 0
            || self.has_acknowledged(recipient_id)
        {
            return self.outcome(false);
        }

        self.acknowledged_by.insert(recipient_id);
        self.unread_count -= 1;
        self.timestamps.touch(now);

        let next = if self.unread_count == 0 {
            MessageStatus::Read
        } else {
            MessageStatus::Sent
        };
        if self.status.can_transition_to(next) {
            self.status = next;
        }

        self.outcome(true)
    }

    fn outcome(&self, changed: bool) -> AckOutcome {
        AckOutcome {
            message_id: self.id,
            room_id: self.room_id,
            sender_id: self.sender_id,
            unread_count: self.unread_count,
            status: self.status,
            created_at: self.timestamps.created_at,
            updated_at: self.timestamps.updated_at,
            changed,
        }
    }
}
