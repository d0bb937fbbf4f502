//! Delivery status of a chat message

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Delivery status: `Pending -> Sent -> Read`.
///
/// Ordering follows the lifecycle, so a transition is legal exactly when the
/// target compares greater than the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    /// Persisted, no live recipient has confirmed delivery yet
    Pending,
    /// At least one live recipient confirmed delivery
    Sent,
    /// Every recipient acknowledged; terminal
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Sent => "SENT",
            Self::Read => "READ",
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        next > self
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Read
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "SENT" => Ok(Self::Sent),
            "READ" => Ok(Self::Read),
            other => Err(format!("unknown message status: {other}")),
        }
    }
}
