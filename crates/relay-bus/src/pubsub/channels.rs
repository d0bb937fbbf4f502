//! Pub/Sub channel definitions.
//!
//! Every chat room has exactly one channel, `chatroom-{roomId}`. Subscribers
//! listen on the `chatroom-*` pattern and recover the room id from the
//! channel name.

use relay_core::Snowflake;

/// Channel prefix for room events
pub const ROOM_CHANNEL_PREFIX: &str = "chatroom-";
/// Pattern matching every room channel
pub const ROOM_CHANNEL_PATTERN: &str = "chatroom-*";

/// The bus channel of one chat room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomChannel(Snowflake);

impl RoomChannel {
    #[must_use]
    pub fn new(room_id: Snowflake) -> Self {
        Self(room_id)
    }

    #[must_use]
    pub fn room_id(&self) -> Snowflake {
        self.0
    }

    /// Get the Redis channel name
    #[must_use]
    pub fn name(&self) -> String {
        format!("{ROOM_CHANNEL_PREFIX}{}", self.0)
    }

    /// Parse a channel name; `None` for anything that is not a room channel
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let id_str = name.strip_prefix(ROOM_CHANNEL_PREFIX)?;
        if id_str.is_empty() || !id_str.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        id_str.parse::<i64>().ok().map(|id| Self(Snowflake::new(id)))
    }
}

impl std::fmt::Display for RoomChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{ROOM_CHANNEL_PREFIX}{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_name() {
        let channel = RoomChannel::new(Snowflake::new(12345));
        assert_eq!(channel.name(), "chatroom-12345");
        assert_eq!(channel.to_string(), "chatroom-12345");
    }

    #[test]
    fn test_channel_parse() {
        let channel = RoomChannel::parse("chatroom-67890").unwrap();
        assert_eq!(channel.room_id(), Snowflake::new(67890));

        assert!(RoomChannel::parse("chatroom-").is_none());
        assert!(RoomChannel::parse("chatroom-abc").is_none());
        assert!(RoomChannel::parse("chatroom--1").is_none());
        assert!(RoomChannel::parse("chatroom-99999999999999999999").is_none());
        assert!(RoomChannel::parse("guild:1").is_none());
    }

    #[test]
    fn test_pattern_covers_names() {
        let name = RoomChannel::new(Snowflake::new(1)).name();
        let prefix = ROOM_CHANNEL_PATTERN.trim_end_matches('*');
        assert!(name.starts_with(prefix));
    }
}
