//! Parse errors for the wire representations of governance types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown rank: {0}")]
    UnknownRank(String),

    #[error("invalid decision: {0}")]
    InvalidDecision(String),

    #[error("invalid vote id: {0}")]
    InvalidVoteId(String),

    #[error("member id must not be empty")]
    EmptyMemberId,
}
