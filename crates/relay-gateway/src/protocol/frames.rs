use relay_core::Snowflake;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Frames sent by a client over the room socket
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientFrame {
    /// Send a text message to the room
    SendText { content: String },
    /// Send an image message to the room
    SendImage { image_url: String },
    /// The message reached this client
    Delivered { message_id: Snowflake },
    /// The message was read by this client
    Read { message_id: Snowflake },
    Ping,
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Frames generated by the gateway itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerFrame {
    Error { code: String, message: String },
    Pong,
}

impl ServerFrame {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Encode for the connection's outbound queue
    pub fn encode(&self) -> Result<Arc<str>, serde_json::Error> {
        serde_json::to_string(self).map(Arc::from)
    }
}
