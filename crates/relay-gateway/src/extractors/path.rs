//! Path parameter extractors
//!
//! Type-safe extraction of Snowflake IDs from path parameters.

use relay_core::Snowflake;

use crate::response::ApiError;

/// Path parameters with room_id
#[derive(Debug, serde::Deserialize)]
pub struct RoomIdPath {
    pub room_id: String,
}

impl RoomIdPath {
    /// Parse room_id as Snowflake
    pub fn room_id(&self) -> Result<Snowflake, ApiError> {
        self.room_id
            .parse()
            .map_err(|_| ApiError::invalid_path("Invalid room_id format"))
    }
}

/// Path parameters with message_id
#[derive(Debug, serde::Deserialize)]
pub struct MessageIdPath {
    pub message_id: String,
}

impl MessageIdPath {
    /// Parse message_id as Snowflake
    pub fn message_id(&self) -> Result<Snowflake, ApiError> {
        self.message_id
            .parse()
            .map_err(|_| ApiError::invalid_path("Invalid message_id format"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path_ids() {
        let room = RoomIdPath {
            room_id: "1234".to_string(),
        };
        assert_eq!(room.room_id().unwrap(), Snowflake::new(1234));

        let message = MessageIdPath {
            message_id: "abc".to_string(),
        };
        assert!(matches!(message.message_id(), Err(ApiError::InvalidPath(_))));
    }
}
