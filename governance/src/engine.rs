//! Governance engine: the operation boundary of the governance core.
//!
//! Every operation reads "now" from the injected clock once and runs as a
//! single store read or write. Mutating operations hold the store's write
//! transaction for their whole duration, which serialises them against
//! each other: two concurrent closes of one vote cannot both tally it, and
//! two concurrent ballots from one member cannot both be recorded.

use std::sync::Arc;

use conclave_store::{GovernanceStore, ReadTxn, StoreError};
use conclave_types::{
    Ballot, Clock, Decision, Member, MemberId, Origin, RandomSource, Timestamp, Vote, VoteId,
    VoteOutcome, VoteStatus,
};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::consequence::{self, AppliedConsequence};
use crate::eligibility::{can_cast_ballot, can_nominate, can_view, Actor, Capability};
use crate::error::GovernanceError;
use crate::lifecycle::{self, Transition};
use crate::params::GovernanceParams;
use crate::promotion;
use crate::registry::CategoryRegistry;
use crate::retirement;
use crate::selector::{self, InquisitorSelection};
use crate::tally::Tally;

/// A vote as shown to one member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoteDetail {
    pub vote: Vote,
    pub tally: Tally,
    pub has_voted: bool,
    pub can_vote: bool,
    pub can_nominate: bool,
}

/// Outcome of one close/tally call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CloseReport {
    pub vote: Vote,
    pub transition: Transition,
    pub consequence: Option<AppliedConsequence>,
}

/// Result of closing every due vote.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DueSweep {
    pub closed: Vec<CloseReport>,
    pub failed: Vec<(VoteId, String)>,
}

impl DueSweep {
    /// Reports whose check moved the vote to CLOSED. A vote closed by a
    /// concurrent caller between the scan and its own transaction shows up
    /// in `closed` without counting here.
    pub fn newly_closed(&self) -> usize {
        self.closed
            .iter()
            .filter(|report| report.transition.closed_now())
            .count()
    }
}

pub struct GovernanceEngine<S> {
    store: Arc<S>,
    registry: CategoryRegistry,
    params: GovernanceParams,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
}

impl<S: GovernanceStore> GovernanceEngine<S> {
    pub fn new(
        store: Arc<S>,
        registry: CategoryRegistry,
        params: GovernanceParams,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            store,
            registry,
            params,
            clock,
            random,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    // ── Member-facing reads ─────────────────────────────────────────────

    /// Votes `member` may see, newest first.
    pub fn list_votes(&self, member: &MemberId) -> Result<Vec<Vote>, GovernanceError> {
        let now = self.clock.now();
        let mut visible = self.store.read(|txn| {
            let (actor_member, is_inquisitor) = load_actor(txn, member)?;
            let actor = Actor::new(&actor_member, is_inquisitor);
            let mut out = Vec::new();
            for vote in txn.votes()? {
                if vote.status == VoteStatus::Closed {
                    continue;
                }
                let Some(category) = self.registry.get(&vote.category) else {
                    debug!(
                        vote_id = %vote.id,
                        category = %vote.category,
                        "skipping vote with unknown category"
                    );
                    continue;
                };
                let has_ballot = txn.ballot(vote.id, member)?.is_some();
                if can_view(actor, &vote, category, &self.registry, has_ballot, now).is_allowed() {
                    out.push(vote);
                }
            }
            Ok::<_, GovernanceError>(out)
        })?;
        visible.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
        Ok(visible)
    }

    /// Full detail of one vote, or [`GovernanceError::NotVisible`].
    pub fn vote_detail(
        &self,
        member: &MemberId,
        id: VoteId,
    ) -> Result<VoteDetail, GovernanceError> {
        let now = self.clock.now();
        self.store.read(|txn| {
            let (actor_member, is_inquisitor) = load_actor(txn, member)?;
            self.detail_for(txn, Actor::new(&actor_member, is_inquisitor), id, now)
        })
    }

    // ── Member-facing writes ────────────────────────────────────────────

    /// Record `member`'s ballot on vote `id`.
    pub fn cast_ballot(
        &self,
        member: &MemberId,
        id: VoteId,
        decision: Decision,
    ) -> Result<VoteDetail, GovernanceError> {
        let now = self.clock.now();
        self.store.write(|txn| {
            let (actor_member, is_inquisitor) = load_actor(&*txn, member)?;
            let actor = Actor::new(&actor_member, is_inquisitor);
            let vote = txn.vote(id)?.ok_or(GovernanceError::NotVisible(id))?;
            let category = self.registry.lookup(&vote.category)?;
            let has_ballot = txn.ballot(id, member)?.is_some();

            if !can_view(actor, &vote, category, &self.registry, has_ballot, now).is_allowed() {
                return Err(GovernanceError::NotVisible(id));
            }
            if has_ballot {
                return Err(GovernanceError::Conflict(format!(
                    "{member} has already voted on vote {id}"
                )));
            }
            if let Capability::Forbidden(reason) | Capability::NotApplicable(reason) =
                can_cast_ballot(actor, &vote, category, now)
            {
                return Err(GovernanceError::Conflict(reason));
            }

            let ballot = Ballot {
                vote: id,
                voter: member.clone(),
                decision,
                cast_at: now,
            };
            txn.insert_ballot(&ballot).map_err(|e| match e {
                StoreError::Duplicate(_) => GovernanceError::Conflict(format!(
                    "{member} has already voted on vote {id}"
                )),
                other => GovernanceError::Store(other),
            })?;
            info!(vote_id = %id, voter = %member, decision = ?decision, "ballot cast");

            self.detail_for(&*txn, actor, id, now)
        })
    }

    /// Supply the target of the caller's open nomination vote.
    pub fn nominate(&self, member: &MemberId, target: &MemberId) -> Result<Vote, GovernanceError> {
        let now = self.clock.now();
        self.store.write(|txn| {
            let (actor_member, is_inquisitor) = load_actor(&*txn, member)?;
            if !is_inquisitor {
                return Err(GovernanceError::Forbidden(
                    "only the current Inquisitor may nominate".to_string(),
                ));
            }
            let actor = Actor::new(&actor_member, is_inquisitor);

            let ban = self.registry.ban_category()?;
            let mut vote = txn
                .votes()?
                .into_iter()
                .filter(|v| {
                    v.category == ban.name
                        && can_nominate(actor, v, ban, &self.registry, now).is_allowed()
                })
                .max_by_key(|v| v.id)
                .ok_or_else(|| {
                    GovernanceError::NotFound("no open nomination vote for this member".to_string())
                })?;

            match txn.member(target)? {
                Some(m) if m.active => {}
                _ => {
                    return Err(GovernanceError::NotFound(format!(
                        "member {target} not found or inactive"
                    )))
                }
            }
            if target == member {
                return Err(GovernanceError::Conflict("you cannot nominate yourself".to_string()));
            }

            lifecycle::nominate(&mut vote, target.clone(), ban, now)?;
            txn.put_vote(&vote)?;
            info!(
                vote_id = %vote.id,
                inquisitor = %member,
                target = %target,
                "ban nomination made"
            );
            Ok(vote)
        })
    }

    /// Open a promotion vote for the caller.
    pub fn initiate_promotion(&self, member: &MemberId) -> Result<Vote, GovernanceError> {
        let now = self.clock.now();
        self.store.write(|txn| {
            let (actor_member, is_inquisitor) = load_actor(&*txn, member)?;
            promotion::initiate_promotion(
                txn,
                Actor::new(&actor_member, is_inquisitor),
                &self.registry,
                &self.params,
                now,
            )
        })
    }

    /// Active members other than the caller, for the Inquisitor to choose a
    /// ban target from.
    pub fn nomination_candidates(&self, member: &MemberId) -> Result<Vec<Member>, GovernanceError> {
        self.store.read(|txn| {
            let (_, is_inquisitor) = load_actor(txn, member)?;
            if !is_inquisitor {
                return Err(GovernanceError::Forbidden(
                    "only the current Inquisitor may list nomination candidates".to_string(),
                ));
            }
            let mut members: Vec<Member> = txn
                .members()?
                .into_iter()
                .filter(|m| m.active && &m.id != member)
                .collect();
            members.sort_by(|a, b| a.display_name.cmp(&b.display_name).then(a.id.cmp(&b.id)));
            Ok(members)
        })
    }

    // ── Scheduler operations ────────────────────────────────────────────

    /// Rotate the Inquisitor role.
    pub fn select_inquisitor(&self) -> Result<InquisitorSelection, GovernanceError> {
        let now = self.clock.now();
        self.store
            .write(|txn| {
                selector::select_inquisitor(
                    txn,
                    &self.registry,
                    &self.params,
                    self.random.as_ref(),
                    now,
                )
            })
            .inspect_err(|e| error!(error = %e, "Inquisitor selection failed"))
    }

    /// Re-evaluate vote `id` against its deadlines, closing and tallying it
    /// when due. Safe to call any number of times.
    pub fn close_vote(&self, id: VoteId) -> Result<CloseReport, GovernanceError> {
        let now = self.clock.now();
        self.store
            .write(|txn| {
                let mut vote = txn
                    .vote(id)?
                    .ok_or_else(|| GovernanceError::NotFound(format!("vote {id}")))?;
                if vote.status == VoteStatus::Closed {
                    return Ok(CloseReport {
                        transition: Transition::AlreadyClosed {
                            outcome: vote.outcome,
                        },
                        vote,
                        consequence: None,
                    });
                }

                let category = self.registry.lookup(&vote.category)?;
                let transition = {
                    let reader = &*txn;
                    lifecycle::check_timeout(&mut vote, category, now, || {
                        Ok(Tally::from_ballots(&reader.ballots(id)?))
                    })?
                };
                if !transition.closed_now() {
                    return Ok(CloseReport {
                        vote,
                        transition,
                        consequence: None,
                    });
                }

                txn.put_vote(&vote)?;
                let consequence = match (&transition, &vote.target) {
                    (Transition::Tallied { outcome: VoteOutcome::Passed, .. }, Some(target)) => {
                        Some(consequence::apply(txn, id, category, target, now)?)
                    }
                    _ => None,
                };

                match transition {
                    Transition::Tallied { tally, outcome } => info!(
                        vote_id = %id,
                        category = %category.name,
                        ?outcome,
                        agree = tally.agree,
                        disagree = tally.disagree,
                        total = tally.total(),
                        "vote closed"
                    ),
                    _ => info!(
                        vote_id = %id,
                        category = %category.name,
                        "vote expired without nomination"
                    ),
                }

                Ok(CloseReport {
                    vote,
                    transition,
                    consequence,
                })
            })
            .inspect_err(|e| match e {
                GovernanceError::NotFound(_) => {}
                other => error!(vote_id = %id, error = %other, "closing vote failed"),
            })
    }

    /// Close every vote whose current deadline has passed. Each vote is
    /// closed in its own transaction; one failure does not stop the rest.
    pub fn close_due_votes(&self) -> Result<DueSweep, GovernanceError> {
        let now = self.clock.now();
        let due: Vec<VoteId> = self.store.read(|txn| {
            Ok::<_, GovernanceError>(
                txn.votes()?
                    .into_iter()
                    .filter(|v| lifecycle::is_due(v, now))
                    .map(|v| v.id)
                    .collect(),
            )
        })?;

        let mut sweep = DueSweep::default();
        for id in due {
            match self.close_vote(id) {
                Ok(report) => sweep.closed.push(report),
                Err(e) => sweep.failed.push((id, e.to_string())),
            }
        }
        info!(
            checked = sweep.closed.len(),
            closed = sweep.newly_closed(),
            failed = sweep.failed.len(),
            "due votes processed"
        );
        Ok(sweep)
    }

    /// Retire top-rank members past their tenure. Returns the count.
    pub fn retire_expired_top_rank(&self) -> Result<u32, GovernanceError> {
        let now = self.clock.now();
        let retired = self
            .store
            .write(|txn| retirement::retire_expired_top_rank(txn, &self.params, now))
            .inspect_err(|e| error!(error = %e, "retirement sweep failed"))?;
        info!(retired, "retirement sweep finished");
        Ok(retired)
    }

    // ── Identity and origin collaborators ───────────────────────────────

    /// Add a member record. Fails with a conflict if the id is taken.
    pub fn enroll_member(&self, member: Member) -> Result<(), GovernanceError> {
        self.store.write(|txn| {
            if txn.member(&member.id)?.is_some() {
                return Err(GovernanceError::Conflict(format!(
                    "member {} already exists",
                    member.id
                )));
            }
            txn.put_member(&member)?;
            info!(member = %member.id, rank = %member.rank, "member enrolled");
            Ok(())
        })
    }

    /// Remember the origin `member` was last seen from. Returns whether the
    /// stored value changed.
    pub fn record_origin(
        &self,
        member: &MemberId,
        origin: &Origin,
    ) -> Result<bool, GovernanceError> {
        self.store.write(|txn| {
            let mut record = txn
                .member(member)?
                .ok_or_else(|| GovernanceError::NotFound(format!("member {member}")))?;
            if record.last_known_origin.as_ref() == Some(origin) {
                return Ok(false);
            }
            record.last_known_origin = Some(origin.clone());
            txn.put_member(&record)?;
            debug!(member = %member, origin = %origin, "origin updated");
            Ok(true)
        })
    }

    pub fn is_blacklisted(&self, origin: &Origin) -> Result<bool, GovernanceError> {
        self.store
            .read(|txn| Ok::<_, GovernanceError>(txn.blacklist_entry(origin)?.is_some()))
    }

    pub fn current_inquisitor(&self) -> Result<Option<MemberId>, GovernanceError> {
        self.store.read(|txn| Ok::<_, GovernanceError>(txn.inquisitor()?))
    }

    pub fn member(&self, id: &MemberId) -> Result<Option<Member>, GovernanceError> {
        self.store.read(|txn| Ok::<_, GovernanceError>(txn.member(id)?))
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    fn detail_for<T: ReadTxn + ?Sized>(
        &self,
        txn: &T,
        actor: Actor<'_>,
        id: VoteId,
        now: Timestamp,
    ) -> Result<VoteDetail, GovernanceError> {
        let vote = txn.vote(id)?.ok_or(GovernanceError::NotVisible(id))?;
        let category = self.registry.lookup(&vote.category)?;
        let has_voted = txn.ballot(id, &actor.member.id)?.is_some();
        if !can_view(actor, &vote, category, &self.registry, has_voted, now).is_allowed() {
            return Err(GovernanceError::NotVisible(id));
        }
        let tally = Tally::from_ballots(&txn.ballots(id)?);
        let can_vote = !has_voted && can_cast_ballot(actor, &vote, category, now).is_allowed();
        let can_nominate = can_nominate(actor, &vote, category, &self.registry, now).is_allowed();
        Ok(VoteDetail {
            vote,
            tally,
            has_voted,
            can_vote,
            can_nominate,
        })
    }
}

/// Resolve the caller and whether they hold the Inquisitor role.
fn load_actor<T: ReadTxn + ?Sized>(
    txn: &T,
    id: &MemberId,
) -> Result<(Member, bool), GovernanceError> {
    let member = txn
        .member(id)?
        .ok_or_else(|| GovernanceError::Forbidden(format!("unknown member {id}")))?;
    let is_inquisitor = txn.inquisitor()?.as_ref() == Some(id);
    Ok((member, is_inquisitor))
}
