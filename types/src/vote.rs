//! Vote records and ballots.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{MemberId, Timestamp, TypeError};

/// Store-allocated vote identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteId(u64);

impl VoteId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for VoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VoteId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(VoteId)
            .map_err(|_| TypeError::InvalidVoteId(s.to_string()))
    }
}

/// Lifecycle phase. Only ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoteStatus {
    Nomination,
    Active,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoteOutcome {
    Pending,
    Passed,
    Failed,
    Expired,
}

impl VoteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for VoteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    /// Category name, resolved through the registry on every read.
    pub category: String,
    pub initiator: MemberId,
    /// Absent until a nomination supplies one.
    pub target: Option<MemberId>,
    pub start_time: Timestamp,
    pub nomination_end_time: Option<Timestamp>,
    /// Absent for nomination-phase votes created without a voting deadline.
    pub end_time: Option<Timestamp>,
    pub status: VoteStatus,
    pub outcome: VoteOutcome,
}

impl Vote {
    pub fn is_closed(&self) -> bool {
        self.status == VoteStatus::Closed
    }

    /// `outcome` is pending exactly while the vote is not closed.
    pub fn is_consistent(&self) -> bool {
        (self.outcome == VoteOutcome::Pending) == (self.status != VoteStatus::Closed)
    }

    /// The deadline of the phase the vote is currently in.
    pub fn current_deadline(&self) -> Option<Timestamp> {
        match self.status {
            VoteStatus::Nomination => self.nomination_end_time,
            VoteStatus::Active => self.end_time,
            VoteStatus::Closed => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Agree,
    Disagree,
}

impl FromStr for Decision {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AGREE" => Ok(Decision::Agree),
            "DISAGREE" => Ok(Decision::Disagree),
            _ => Err(TypeError::InvalidDecision(s.to_string())),
        }
    }
}

/// One member's immutable decision on one vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub vote: VoteId,
    pub voter: MemberId,
    pub decision: Decision,
    pub cast_at: Timestamp,
}
