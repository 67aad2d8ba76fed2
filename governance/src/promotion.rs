//! Promotion initiation policy.
//!
//! A member asks to be promoted one rank. The request opens an ACTIVE vote
//! targeting the member and starts a cooldown.

use conclave_store::WriteTxn;
use conclave_types::{Member, Timestamp, Vote, VoteOutcome, VoteStatus};
use conclave_utils::format_duration;
use tracing::info;

use crate::eligibility::{can_initiate, Actor, Capability};
use crate::error::GovernanceError;
use crate::params::GovernanceParams;
use crate::registry::CategoryRegistry;

pub fn initiate_promotion(
    txn: &mut dyn WriteTxn,
    actor: Actor<'_>,
    registry: &CategoryRegistry,
    params: &GovernanceParams,
    now: Timestamp,
) -> Result<Vote, GovernanceError> {
    let member = actor.member;
    let Some(to) = member.rank.next() else {
        return Err(GovernanceError::Forbidden(
            "the top rank cannot initiate a promotion".to_string(),
        ));
    };

    if let Some(last) = member.last_promotion_attempt {
        let cooldown = params.promotion_cooldown_secs();
        if !last.has_expired(cooldown, now) {
            let remaining = cooldown - last.elapsed_since(now);
            return Err(GovernanceError::Forbidden(format!(
                "promotion cooldown active, {} remaining",
                format_duration(remaining)
            )));
        }
    }

    if to.is_top() && top_rank_occupied(&*txn)? {
        return Err(GovernanceError::Forbidden(format!(
            "an active member already holds {to}"
        )));
    }

    let category = registry.promotion_category(to)?;
    if let Capability::Forbidden(reason) | Capability::NotApplicable(reason) =
        can_initiate(actor, category)
    {
        return Err(GovernanceError::Forbidden(reason));
    }

    let vote = Vote {
        id: txn.allocate_vote_id()?,
        category: category.name.clone(),
        initiator: member.id.clone(),
        target: Some(member.id.clone()),
        start_time: now,
        nomination_end_time: None,
        end_time: Some(now.plus_hours(category.voting_window_hours)),
        status: VoteStatus::Active,
        outcome: VoteOutcome::Pending,
    };
    txn.put_vote(&vote)?;

    let updated = Member {
        last_promotion_attempt: Some(now),
        ..member.clone()
    };
    txn.put_member(&updated)?;

    info!(member = %member.id, to = %to, vote_id = %vote.id, "promotion vote opened");
    Ok(vote)
}

fn top_rank_occupied(txn: &dyn WriteTxn) -> Result<bool, GovernanceError> {
    Ok(txn
        .members()?
        .iter()
        .any(|m| m.active && m.rank.is_top()))
}
