//! Snowflake ID - 64-bit time-ordered identifier
//!
//! Layout (most significant first):
//! - 41 bits: milliseconds since [`Snowflake::EPOCH`]
//! - 10 bits: worker ID (0-1023)
//! - 12 bits: per-millisecond sequence (0-4095)

use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const WORKER_BITS: u8 = 10;
const SEQUENCE_BITS: u8 = 12;
const MAX_WORKER_ID: u16 = (1 << WORKER_BITS) - 1;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;

/// Time-ordered unique identifier for rooms, members, and messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Snowflake(i64);

impl Snowflake {
    /// Custom epoch: 2025-01-01 00:00:00 UTC (milliseconds)
    pub const EPOCH: i64 = 1_735_689_600_000;

    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn into_inner(self) -> i64 {
        self.0
    }

    /// Milliseconds since the Unix epoch encoded in this ID
    #[inline]
    pub fn timestamp(&self) -> i64 {
        (self.0 >> (WORKER_BITS + SEQUENCE_BITS)) + Self::EPOCH
    }

    #[inline]
    pub fn worker_id(&self) -> u16 {
        ((self.0 >> SEQUENCE_BITS) & i64::from(MAX_WORKER_ID)) as u16
    }

    pub fn parse(s: &str) -> Result<Self, SnowflakeParseError> {
        s.trim()
            .parse::<i64>()
            .map(Snowflake)
            .map_err(|_| SnowflakeParseError::InvalidFormat(s.to_string()))
    }
}

/// Error when parsing a Snowflake from a string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnowflakeParseError {
    #[error("invalid snowflake: {0:?}")]
    InvalidFormat(String),
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Snowflake {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<Snowflake> for i64 {
    fn from(id: Snowflake) -> Self {
        id.0
    }
}

impl std::str::FromStr for Snowflake {
    type Err = SnowflakeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Snowflake::parse(s)
    }
}

// Serialized as a string so JavaScript clients never lose precision
impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(i64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(Snowflake(n)),
            Repr::Text(s) => Snowflake::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_timestamp: i64,
    sequence: i64,
}

/// Thread-safe Snowflake generator
///
/// Up to 4096 IDs per millisecond per worker. When the sequence is exhausted
/// (or the clock steps backwards) the generator borrows from the next
/// millisecond instead of sleeping, so IDs stay strictly increasing.
pub struct SnowflakeGenerator {
    worker_id: u16,
    state: Mutex<GeneratorState>,
}

impl SnowflakeGenerator {
    /// Create a new generator; worker IDs above 1023 are masked into range.
    pub fn new(worker_id: u16) -> Self {
        Self {
            worker_id: worker_id & MAX_WORKER_ID,
            state: Mutex::new(GeneratorState::default()),
        }
    }

    pub fn generate(&self) -> Snowflake {
        let now = chrono::Utc::now().timestamp_millis();
        let mut state = self.state.lock();

        if now > state.last_timestamp {
            state.last_timestamp = now;
            state.sequence = 0;
        } else {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                state.last_timestamp += 1;
            }
        }

        let id = ((state.last_timestamp - Snowflake::EPOCH) << (WORKER_BITS + SEQUENCE_BITS))
            | (i64::from(self.worker_id) << SEQUENCE_BITS)
            | state.sequence;
        Snowflake(id)
    }

    pub fn worker_id(&self) -> u16 {
        self.worker_id
    }
}

impl Default for SnowflakeGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_parse_and_display() {
        let id = Snowflake::parse("987654321").unwrap();
        assert_eq!(id.into_inner(), 987_654_321);
        assert_eq!(id.to_string(), "987654321");
        assert!(Snowflake::parse("room-1").is_err());
    }

    #[test]
    fn test_json_is_string_and_accepts_numbers() {
        let id = Snowflake::new(123_456_789_012_345_678);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"123456789012345678\"");

        let from_str: Snowflake = serde_json::from_str("\"42\"").unwrap();
        let from_num: Snowflake = serde_json::from_str("42").unwrap();
        assert_eq!(from_str, from_num);
    }

    #[test]
    fn test_generator_is_strictly_increasing() {
        let gen = SnowflakeGenerator::new(3);
        let mut last = Snowflake::default();
        for _ in 0..10_000 {
            let id = gen.generate();
            assert!(id > last);
            last = id;
        }
        assert_eq!(last.worker_id(), 3);
    }

    #[test]
    fn test_generator_across_threads() {
        let gen = Arc::new(SnowflakeGenerator::new(1));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gen = Arc::clone(&gen);
                std::thread::spawn(move || (0..1000).map(|_| gen.generate()).collect::<Vec<_>>())
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            ids.extend(handle.join().unwrap());
        }
        assert_eq!(ids.len(), 4000);
    }

    #[test]
    fn test_timestamp_is_recent() {
        let before = chrono::Utc::now().timestamp_millis();
        let id = SnowflakeGenerator::default().generate();
        assert!(id.timestamp() >= before);
    }
}
