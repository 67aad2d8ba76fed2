//! Community members as seen by the governance core.
//!
//! Credentials and registration live with the identity provider; only the
//! fields that votes read or mutate are modelled here.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Rank, Timestamp, TypeError};

/// Stable member identifier issued by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse an id coming from an untrusted source (header, request body).
    pub fn parse(id: &str) -> Result<Self, TypeError> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(TypeError::EmptyMemberId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Network origin a member was last seen from (an IP address in practice).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(String);

impl Origin {
    pub fn new(origin: impl Into<String>) -> Self {
        Self(origin.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub display_name: String,
    pub rank: Rank,
    /// Start of the current promotion cooldown, if the member ever initiated one.
    pub last_promotion_attempt: Option<Timestamp>,
    /// Set whenever `rank` changes.
    pub rank_assigned_at: Timestamp,
    pub last_known_origin: Option<Origin>,
    pub active: bool,
}

impl Member {
    /// A fresh, active member at the lowest rank.
    pub fn new(id: MemberId, display_name: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            rank: Rank::LOWEST,
            last_promotion_attempt: None,
            rank_assigned_at: now,
            last_known_origin: None,
            active: true,
        }
    }

    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.last_known_origin = Some(origin);
        self
    }

    /// Change rank and restart the tenure clock.
    pub fn assign_rank(&mut self, rank: Rank, now: Timestamp) {
        self.rank = rank;
        self.rank_assigned_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_rejects_empty() {
        assert_eq!(MemberId::parse("  alice ").unwrap().as_str(), "alice");
        assert_eq!(MemberId::parse("   "), Err(TypeError::EmptyMemberId));
    }

    #[test]
    fn new_member_starts_active_at_lowest_rank() {
        let m = Member::new(MemberId::new("m1"), "Mira", Timestamp::new(10));
        assert!(m.active);
        assert_eq!(m.rank, Rank::LOWEST);
        assert_eq!(m.rank_assigned_at, Timestamp::new(10));
    }

    #[test]
    fn assign_rank_resets_tenure() {
        let mut m = Member::new(MemberId::new("m1"), "Mira", Timestamp::new(10));
        m.assign_rank(Rank::Golden, Timestamp::new(99));
        assert_eq!(m.rank, Rank::Golden);
        assert_eq!(m.rank_assigned_at, Timestamp::new(99));
    }
}
