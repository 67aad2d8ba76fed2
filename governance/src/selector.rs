//! Inquisitor rotation.

use conclave_store::WriteTxn;
use conclave_types::{MemberId, RandomSource, Timestamp, Vote, VoteOutcome, VoteStatus};
use rand::rngs::OsRng;
use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::error::GovernanceError;
use crate::params::GovernanceParams;
use crate::registry::CategoryRegistry;

/// Operating-system randomness. Not seedable, so participants cannot
/// predict who is chosen.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn pick_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(OsRng.gen_range(0..len))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum InquisitorSelection {
    /// No active member holds the Inquisitor rank; the role stays vacant.
    NoCandidates,
    Selected { member: MemberId, vote: Vote },
}

/// Vacate the role, draw a new holder from the active members of the
/// Inquisitor rank, and open a nomination-phase ban vote for them.
///
/// Must run inside one write transaction: the pointer is never observed
/// empty or pointing at two members by concurrent readers.
pub fn select_inquisitor(
    txn: &mut dyn WriteTxn,
    registry: &CategoryRegistry,
    params: &GovernanceParams,
    random: &dyn RandomSource,
    now: Timestamp,
) -> Result<InquisitorSelection, GovernanceError> {
    let previous = txn.inquisitor()?;
    txn.set_inquisitor(None)?;

    let candidates: Vec<MemberId> = txn
        .members()?
        .into_iter()
        .filter(|m| m.active && m.rank == params.inquisitor_rank)
        .map(|m| m.id)
        .collect();

    let Some(index) = random.pick_index(candidates.len()) else {
        info!(previous = ?previous, "no candidates for the Inquisitor role");
        return Ok(InquisitorSelection::NoCandidates);
    };
    let chosen = candidates
        .get(index)
        .cloned()
        .ok_or_else(|| GovernanceError::Configuration("random pick out of range".to_string()))?;

    let ban = registry.ban_category()?;
    let nomination_hours = ban
        .nomination_window_hours
        .unwrap_or(params.default_nomination_window_hours);
    let nomination_end = now.plus_hours(nomination_hours);

    txn.set_inquisitor(Some(&chosen))?;
    let vote = Vote {
        id: txn.allocate_vote_id()?,
        category: ban.name.clone(),
        initiator: chosen.clone(),
        target: None,
        start_time: now,
        nomination_end_time: Some(nomination_end),
        end_time: Some(nomination_end.plus_hours(ban.voting_window_hours)),
        status: VoteStatus::Nomination,
        outcome: VoteOutcome::Pending,
    };
    txn.put_vote(&vote)?;

    info!(
        previous = ?previous,
        inquisitor = %chosen,
        vote_id = %vote.id,
        candidates = candidates.len(),
        "new Inquisitor selected"
    );
    Ok(InquisitorSelection::Selected {
        member: chosen,
        vote,
    })
}
