//! Creation/update timestamps embedded in every persisted entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit timestamps, populated explicitly by whoever creates or mutates the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    /// Both timestamps set to `now`
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a mutation. `created_at` never moves.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}
