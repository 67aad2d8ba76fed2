//! Eligibility guard.
//!
//! Every question "may this member do X to this vote" goes through one of
//! the capability queries below, and vote visibility is derived from the
//! same queries, so list filtering and single-vote retrieval cannot
//! disagree.

use conclave_types::{Member, Timestamp, Vote, VoteStatus};

use crate::registry::{CategoryRegistry, ConsequenceKind, VoteCategory};

/// Answer to a capability query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Capability {
    Allowed,
    /// The member lacks rank, role or standing for the action.
    Forbidden(String),
    /// The action does not apply to the vote in its current phase or window.
    NotApplicable(String),
}

impl Capability {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Capability::Allowed)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Capability::Allowed => None,
            Capability::Forbidden(r) | Capability::NotApplicable(r) => Some(r),
        }
    }
}

/// The member asking, plus whether they hold the Inquisitor role.
#[derive(Clone, Copy, Debug)]
pub struct Actor<'a> {
    pub member: &'a Member,
    pub is_inquisitor: bool,
}

impl<'a> Actor<'a> {
    pub fn new(member: &'a Member, is_inquisitor: bool) -> Self {
        Self {
            member,
            is_inquisitor,
        }
    }
}

/// May `actor` open a new vote in `category`?
///
/// Promotion categories follow the rank ladder: a member may only initiate
/// the promotion to the rank directly above their own. Other categories
/// can only be opened by the current Inquisitor, and only when the category
/// allows it. Cooldown and top-rank occupancy are checked by the promotion
/// policy, which needs store access.
pub fn can_initiate(actor: Actor<'_>, category: &VoteCategory) -> Capability {
    let member = actor.member;
    if !member.active {
        return Capability::Forbidden("member is inactive".to_string());
    }
    match category.consequence {
        ConsequenceKind::PromoteTo(to) => match member.rank.next() {
            Some(next) if next == to => Capability::Allowed,
            Some(_) => Capability::Forbidden(format!(
                "rank {} cannot initiate promotion to {}",
                member.rank, to
            )),
            None => Capability::Forbidden("the top rank cannot initiate a promotion".to_string()),
        },
        _ if category.inquisitor_can_initiate => {
            if actor.is_inquisitor {
                Capability::Allowed
            } else {
                Capability::Forbidden(format!(
                    "only the current Inquisitor may initiate a {} vote",
                    category.name
                ))
            }
        }
        _ => Capability::Forbidden(format!(
            "{} votes cannot be initiated by members",
            category.name
        )),
    }
}

/// May `actor` supply the target of `vote` now?
pub fn can_nominate(
    actor: Actor<'_>,
    vote: &Vote,
    category: &VoteCategory,
    registry: &CategoryRegistry,
    now: Timestamp,
) -> Capability {
    if vote.status != VoteStatus::Nomination {
        return Capability::NotApplicable(format!("vote {} is not in nomination", vote.id));
    }
    if !registry.is_ban_category(category) {
        return Capability::NotApplicable(format!(
            "{} votes have no nomination step",
            category.name
        ));
    }
    if !actor.member.active || !actor.is_inquisitor {
        return Capability::Forbidden("only the current Inquisitor may nominate".to_string());
    }
    if vote.initiator != actor.member.id {
        return Capability::Forbidden(format!("vote {} was opened by another member", vote.id));
    }
    match vote.nomination_end_time {
        Some(end) if now >= end => {
            Capability::NotApplicable(format!("nomination for vote {} has closed", vote.id))
        }
        _ => Capability::Allowed,
    }
}

/// May `actor` cast a ballot on `vote` now?
///
/// Eligibility is rank membership only; there is no special case for the
/// target of the vote.
pub fn can_cast_ballot(
    actor: Actor<'_>,
    vote: &Vote,
    category: &VoteCategory,
    now: Timestamp,
) -> Capability {
    let member = actor.member;
    if vote.status != VoteStatus::Active {
        return Capability::NotApplicable(format!("vote {} is not accepting ballots", vote.id));
    }
    if !member.active {
        return Capability::Forbidden("member is inactive".to_string());
    }
    if !category.eligible_voters.admits(member.rank) {
        return Capability::Forbidden(format!(
            "rank {} may not vote on {} votes",
            member.rank, category.name
        ));
    }
    match vote.end_time {
        Some(end) if now < end => Capability::Allowed,
        _ => Capability::NotApplicable(format!("voting on vote {} has ended", vote.id)),
    }
}

/// May `actor` see `vote` at all?
///
/// Visible means: not closed, and the member can nominate on it, can vote
/// on it, or already voted on it. Everything else is reported to callers as
/// not found.
pub fn can_view(
    actor: Actor<'_>,
    vote: &Vote,
    category: &VoteCategory,
    registry: &CategoryRegistry,
    has_ballot: bool,
    now: Timestamp,
) -> Capability {
    if vote.status == VoteStatus::Closed {
        return Capability::NotApplicable(format!("vote {} is closed", vote.id));
    }
    if has_ballot
        || can_nominate(actor, vote, category, registry, now).is_allowed()
        || can_cast_ballot(actor, vote, category, now).is_allowed()
    {
        Capability::Allowed
    } else {
        Capability::Forbidden(format!("no standing on vote {}", vote.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::GovernanceParams;
    use conclave_types::{MemberId, Rank, VoteId, VoteOutcome};

    fn registry() -> CategoryRegistry {
        CategoryRegistry::standard(&GovernanceParams::default()).unwrap()
    }

    fn member(id: &str, rank: Rank) -> Member {
        Member::new(MemberId::new(id), id, Timestamp::new(0)).with_rank(rank)
    }

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    fn ban_vote(status: VoteStatus, initiator: &str) -> Vote {
        Vote {
            id: VoteId::new(1),
            category: "BAN".into(),
            initiator: MemberId::new(initiator),
            target: None,
            start_time: ts(0),
            nomination_end_time: Some(ts(100)),
            end_time: Some(ts(200)),
            status,
            outcome: VoteOutcome::Pending,
        }
    }

    // ── can_initiate ────────────────────────────────────────────────────

    #[test]
    fn promotion_follows_the_rank_ladder() {
        let reg = registry();
        let mason = member("m", Rank::Mason);
        let to_silver = reg.promotion_category(Rank::Silver).unwrap();
        let to_golden = reg.promotion_category(Rank::Golden).unwrap();
        assert!(can_initiate(Actor::new(&mason, false), to_silver).is_allowed());
        assert!(matches!(
            can_initiate(Actor::new(&mason, false), to_golden),
            Capability::Forbidden(_)
        ));
    }

    #[test]
    fn top_rank_cannot_initiate_promotion() {
        let reg = registry();
        let arch = member("a", Rank::Architect);
        let to_arch = reg.promotion_category(Rank::Architect).unwrap();
        assert!(!can_initiate(Actor::new(&arch, false), to_arch).is_allowed());
    }

    #[test]
    fn inquisitor_gated_category_needs_the_role() {
        let reg = registry();
        let golden = member("g", Rank::Golden);
        let ban = reg.ban_category().unwrap();
        assert!(can_initiate(Actor::new(&golden, true), ban).is_allowed());
        assert!(!can_initiate(Actor::new(&golden, false), ban).is_allowed());
    }

    // ── can_nominate ────────────────────────────────────────────────────

    #[test]
    fn inquisitor_initiator_may_nominate_before_deadline() {
        let reg = registry();
        let inq = member("inq", Rank::Golden);
        let vote = ban_vote(VoteStatus::Nomination, "inq");
        let ban = reg.ban_category().unwrap();
        assert_eq!(
            can_nominate(Actor::new(&inq, true), &vote, ban, &reg, ts(99)),
            Capability::Allowed
        );
        assert!(matches!(
            can_nominate(Actor::new(&inq, true), &vote, ban, &reg, ts(100)),
            Capability::NotApplicable(_)
        ));
    }

    #[test]
    fn nomination_requires_role_and_authorship() {
        let reg = registry();
        let ban = reg.ban_category().unwrap();
        let other = member("other", Rank::Golden);
        let vote = ban_vote(VoteStatus::Nomination, "inq");
        assert!(matches!(
            can_nominate(Actor::new(&other, false), &vote, ban, &reg, ts(1)),
            Capability::Forbidden(_)
        ));
        assert!(matches!(
            can_nominate(Actor::new(&other, true), &vote, ban, &reg, ts(1)),
            Capability::Forbidden(_)
        ));
    }

    #[test]
    fn nomination_not_applicable_once_active() {
        let reg = registry();
        let inq = member("inq", Rank::Golden);
        let vote = ban_vote(VoteStatus::Active, "inq");
        assert!(matches!(
            can_nominate(Actor::new(&inq, true), &vote, reg.ban_category().unwrap(), &reg, ts(1)),
            Capability::NotApplicable(_)
        ));
    }

    // ── can_cast_ballot ─────────────────────────────────────────────────

    #[test]
    fn ballot_requires_eligible_rank_and_open_window() {
        let reg = registry();
        let ban = reg.ban_category().unwrap();
        let vote = ban_vote(VoteStatus::Active, "inq");
        let silver = member("s", Rank::Silver);
        let mason = member("m", Rank::Mason);
        assert!(can_cast_ballot(Actor::new(&silver, false), &vote, ban, ts(150)).is_allowed());
        assert!(matches!(
            can_cast_ballot(Actor::new(&mason, false), &vote, ban, ts(150)),
            Capability::Forbidden(_)
        ));
        assert!(matches!(
            can_cast_ballot(Actor::new(&silver, false), &vote, ban, ts(200)),
            Capability::NotApplicable(_)
        ));
    }

    #[test]
    fn inactive_member_cannot_vote() {
        let reg = registry();
        let mut silver = member("s", Rank::Silver);
        silver.active = false;
        let vote = ban_vote(VoteStatus::Active, "inq");
        assert!(matches!(
            can_cast_ballot(Actor::new(&silver, false), &vote, reg.ban_category().unwrap(), ts(1)),
            Capability::Forbidden(_)
        ));
    }

    // ── can_view ────────────────────────────────────────────────────────

    #[test]
    fn ineligible_rank_cannot_see_active_vote() {
        let reg = registry();
        let ban = reg.ban_category().unwrap();
        let vote = ban_vote(VoteStatus::Active, "inq");
        let mason = member("m", Rank::Mason);
        assert!(!can_view(Actor::new(&mason, false), &vote, ban, &reg, false, ts(1)).is_allowed());
    }

    #[test]
    fn past_voter_keeps_visibility_after_window() {
        let reg = registry();
        let ban = reg.ban_category().unwrap();
        let vote = ban_vote(VoteStatus::Active, "inq");
        let silver = member("s", Rank::Silver);
        let actor = Actor::new(&silver, false);
        assert!(can_view(actor, &vote, ban, &reg, true, ts(500)).is_allowed());
        assert!(!can_view(actor, &vote, ban, &reg, false, ts(500)).is_allowed());
    }

    #[test]
    fn closed_votes_are_never_visible() {
        let reg = registry();
        let ban = reg.ban_category().unwrap();
        let mut vote = ban_vote(VoteStatus::Closed, "inq");
        vote.outcome = VoteOutcome::Failed;
        let silver = member("s", Rank::Silver);
        assert!(matches!(
            can_view(Actor::new(&silver, false), &vote, ban, &reg, true, ts(1)),
            Capability::NotApplicable(_)
        ));
    }
}
