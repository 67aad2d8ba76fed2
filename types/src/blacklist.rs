//! Blacklisted network origins.

use serde::{Deserialize, Serialize};

use crate::{Origin, Timestamp};

/// An origin denied further access. Unique per origin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub origin: Origin,
    pub reason: String,
    pub created_at: Timestamp,
}

impl BlacklistEntry {
    pub fn new(origin: Origin, reason: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            origin,
            reason: reason.into(),
            created_at,
        }
    }
}
