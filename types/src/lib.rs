//! Fundamental types for conclave.
//!
//! This crate defines the data shared across every other crate in the workspace:
//! ranks, members, votes, ballots, blacklist entries, timestamps, and the
//! clock / randomness seams that the governance core is driven through.

pub mod blacklist;
pub mod error;
pub mod member;
pub mod random;
pub mod rank;
pub mod time;
pub mod vote;

pub use blacklist::BlacklistEntry;
pub use error::TypeError;
pub use member::{Member, MemberId, Origin};
pub use random::RandomSource;
pub use rank::Rank;
pub use time::{Clock, SystemClock, Timestamp, SECS_PER_DAY, SECS_PER_HOUR};
pub use vote::{Ballot, Decision, Vote, VoteId, VoteOutcome, VoteStatus};
