//! Side effects of a passed vote.
//!
//! Runs inside the write transaction that closes the vote, so the effects
//! commit together with the CLOSED status or not at all.

use conclave_store::WriteTxn;
use conclave_types::{BlacklistEntry, Member, MemberId, Origin, Rank, Timestamp, VoteId};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::GovernanceError;
use crate::registry::{ConsequenceKind, VoteCategory};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "consequence", rename_all = "snake_case")]
pub enum AppliedConsequence {
    Banned {
        member: MemberId,
        /// The origin newly added to the blacklist, if any.
        blacklisted: Option<Origin>,
    },
    Promoted {
        member: MemberId,
        rank: Rank,
    },
    /// The category has no consequence handler.
    Unhandled,
    /// The target no longer exists in the store.
    TargetMissing {
        member: MemberId,
    },
}

/// Apply the consequence of `category` to `target` for a vote that just
/// passed.
pub fn apply(
    txn: &mut dyn WriteTxn,
    vote: VoteId,
    category: &VoteCategory,
    target: &MemberId,
    now: Timestamp,
) -> Result<AppliedConsequence, GovernanceError> {
    if category.consequence == ConsequenceKind::None {
        warn!(
            vote_id = %vote,
            category = %category.name,
            target = %target,
            "vote passed but its category has no consequence handler"
        );
        return Ok(AppliedConsequence::Unhandled);
    }

    let Some(mut member) = txn.member(target)? else {
        warn!(vote_id = %vote, target = %target, "passed vote targets an unknown member");
        return Ok(AppliedConsequence::TargetMissing {
            member: target.clone(),
        });
    };

    match category.consequence {
        ConsequenceKind::Ban => {
            let reason = format!("Banned by vote {vote}");
            let blacklisted = deactivate_and_blacklist(txn, &mut member, &reason, now)?;
            info!(
                vote_id = %vote,
                member = %member.id,
                blacklisted = ?blacklisted,
                "member banned"
            );
            Ok(AppliedConsequence::Banned {
                member: member.id,
                blacklisted,
            })
        }
        ConsequenceKind::PromoteTo(rank) => {
            let from = member.rank;
            member.assign_rank(rank, now);
            txn.put_member(&member)?;
            info!(vote_id = %vote, member = %member.id, %from, to = %rank, "member promoted");
            Ok(AppliedConsequence::Promoted {
                member: member.id,
                rank,
            })
        }
        ConsequenceKind::None => Ok(AppliedConsequence::Unhandled),
    }
}

/// Deactivate `member`, release the Inquisitor role if they hold it, and
/// blacklist their last known origin.
///
/// Returns the origin if a new blacklist entry was written. An origin that
/// is already blacklisted is left as is.
pub fn deactivate_and_blacklist(
    txn: &mut dyn WriteTxn,
    member: &mut Member,
    reason: &str,
    now: Timestamp,
) -> Result<Option<Origin>, GovernanceError> {
    member.active = false;
    txn.put_member(member)?;

    if txn.inquisitor()?.as_ref() == Some(&member.id) {
        txn.set_inquisitor(None)?;
        info!(member = %member.id, "deactivated member released the Inquisitor role");
    }

    let Some(origin) = member.last_known_origin.clone() else {
        return Ok(None);
    };
    let inserted = txn.insert_blacklist_entry(&BlacklistEntry::new(origin.clone(), reason, now))?;
    if inserted {
        info!(origin = %origin, reason, "origin added to blacklist");
        Ok(Some(origin))
    } else {
        Ok(None)
    }
}
