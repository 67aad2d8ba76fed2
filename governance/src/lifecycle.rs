//! Vote state machine.
//!
//! Pure transitions on a [`Vote`] record. Callers load the vote, apply a
//! transition, and write it back inside the same store transaction.

use conclave_types::{MemberId, Timestamp, Vote, VoteOutcome, VoteStatus};
use serde::Serialize;

use crate::error::GovernanceError;
use crate::registry::VoteCategory;
use crate::tally::Tally;

/// Result of a timeout check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "transition", rename_all = "snake_case")]
pub enum Transition {
    /// Already CLOSED before the check; nothing changed.
    AlreadyClosed { outcome: VoteOutcome },
    /// Still in nomination and the deadline has not passed.
    NominationOpen,
    /// Still active and the voting deadline has not passed.
    VotingOpen,
    /// Nomination deadline passed without a target: CLOSED / EXPIRED.
    Expired,
    /// Voting deadline passed: CLOSED with the tallied outcome.
    Tallied { tally: Tally, outcome: VoteOutcome },
}

impl Transition {
    /// Whether this check moved the vote to CLOSED.
    pub fn closed_now(&self) -> bool {
        matches!(self, Transition::Expired | Transition::Tallied { .. })
    }
}

/// Whether a timeout check on `vote` would close it at `now`.
///
/// A nomination without a deadline never expires; an active vote without a
/// deadline is due immediately.
pub fn is_due(vote: &Vote, now: Timestamp) -> bool {
    match vote.status {
        VoteStatus::Nomination => vote.nomination_end_time.is_some_and(|end| now >= end),
        VoteStatus::Active => vote.end_time.map_or(true, |end| now >= end),
        VoteStatus::Closed => false,
    }
}

/// Supply the target of a nomination-phase vote and open voting.
pub fn nominate(
    vote: &mut Vote,
    target: MemberId,
    category: &VoteCategory,
    now: Timestamp,
) -> Result<(), GovernanceError> {
    if vote.status != VoteStatus::Nomination {
        return Err(GovernanceError::Conflict(format!(
            "vote {} is not in nomination",
            vote.id
        )));
    }
    vote.target = Some(target);
    vote.status = VoteStatus::Active;
    vote.nomination_end_time = None;
    vote.end_time = Some(now.plus_hours(category.voting_window_hours));
    Ok(())
}

/// Re-evaluate `vote` against its stored deadlines.
///
/// `count` is only called when the voting deadline has passed. CLOSED is
/// terminal: checking a closed vote reports its outcome and changes nothing.
pub fn check_timeout<F>(
    vote: &mut Vote,
    category: &VoteCategory,
    now: Timestamp,
    count: F,
) -> Result<Transition, GovernanceError>
where
    F: FnOnce() -> Result<Tally, GovernanceError>,
{
    match vote.status {
        VoteStatus::Closed => Ok(Transition::AlreadyClosed {
            outcome: vote.outcome,
        }),
        VoteStatus::Nomination => match vote.nomination_end_time {
            Some(end) if now >= end => {
                vote.status = VoteStatus::Closed;
                vote.outcome = VoteOutcome::Expired;
                Ok(Transition::Expired)
            }
            _ => Ok(Transition::NominationOpen),
        },
        VoteStatus::Active => {
            if let Some(end) = vote.end_time {
                if now < end {
                    return Ok(Transition::VotingOpen);
                }
            }
            let tally = count()?;
            let outcome = tally.outcome(category.pass_condition);
            vote.status = VoteStatus::Closed;
            vote.outcome = outcome;
            Ok(Transition::Tallied { tally, outcome })
        }
    }
}
