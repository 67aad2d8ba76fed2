//! Request handlers and their wire types.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use conclave_governance::{CloseReport, DueSweep, InquisitorSelection, Transition, VoteDetail};
use conclave_store::GovernanceStore;
use conclave_types::{Decision, Member, MemberId, Origin, Rank, Vote, VoteId};
use serde::{Deserialize, Serialize};

use crate::auth::Caller;
use crate::error::RpcError;
use crate::server::{blocking, AppState};

type Shared<S> = State<Arc<AppState<S>>>;

// ── Votes ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteListResponse {
    pub votes: Vec<Vote>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BallotRequest {
    pub decision: String,
}

pub async fn list_votes<S: GovernanceStore + 'static>(
    State(state): Shared<S>,
    Caller(member): Caller,
) -> Result<Json<VoteListResponse>, RpcError> {
    let votes = blocking(&state, move |engine| engine.list_votes(&member)).await?;
    Ok(Json(VoteListResponse { votes }))
}

pub async fn vote_detail<S: GovernanceStore + 'static>(
    State(state): Shared<S>,
    Caller(member): Caller,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<VoteDetail>, RpcError> {
    let Path(id) = path?;
    let detail = blocking(&state, move |engine| {
        engine.vote_detail(&member, VoteId::new(id))
    })
    .await?;
    Ok(Json(detail))
}

pub async fn cast_ballot<S: GovernanceStore + 'static>(
    State(state): Shared<S>,
    Caller(member): Caller,
    path: Result<Path<u64>, PathRejection>,
    body: Result<Json<BallotRequest>, JsonRejection>,
) -> Result<Json<VoteDetail>, RpcError> {
    let result: Result<VoteDetail, RpcError> = async {
        let Path(id) = path?;
        let Json(request) = body?;
        let decision: Decision = request
            .decision
            .parse()
            .map_err(|e: conclave_types::TypeError| RpcError::InvalidRequest(e.to_string()))?;
        blocking(&state, move |engine| {
            engine.cast_ballot(&member, VoteId::new(id), decision)
        })
        .await
    }
    .await;

    match &result {
        Ok(_) => state.record(|m| m.ballots_cast.inc()),
        Err(_) => state.record(|m| m.ballots_rejected.inc()),
    }
    result.map(Json)
}

// ── Nominations ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct NominationRequest {
    pub target: String,
}

/// A member the Inquisitor may nominate.
#[derive(Debug, Serialize, Deserialize)]
pub struct CandidateView {
    pub id: MemberId,
    pub display_name: String,
    pub rank: Rank,
}

impl From<Member> for CandidateView {
    fn from(member: Member) -> Self {
        Self {
            id: member.id,
            display_name: member.display_name,
            rank: member.rank,
        }
    }
}

pub async fn nominate<S: GovernanceStore + 'static>(
    State(state): Shared<S>,
    Caller(member): Caller,
    body: Result<Json<NominationRequest>, JsonRejection>,
) -> Result<Json<Vote>, RpcError> {
    let Json(request) = body?;
    let target = MemberId::parse(&request.target)
        .map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
    let vote = blocking(&state, move |engine| engine.nominate(&member, &target)).await?;
    state.record(|m| m.nominations.inc());
    Ok(Json(vote))
}

pub async fn nomination_candidates<S: GovernanceStore + 'static>(
    State(state): Shared<S>,
    Caller(member): Caller,
) -> Result<Json<Vec<CandidateView>>, RpcError> {
    let members = blocking(&state, move |engine| engine.nomination_candidates(&member)).await?;
    Ok(Json(members.into_iter().map(CandidateView::from).collect()))
}

// ── Promotions ───────────────────────────────────────────────────────────

pub async fn initiate_promotion<S: GovernanceStore + 'static>(
    State(state): Shared<S>,
    Caller(member): Caller,
) -> Result<(StatusCode, Json<Vote>), RpcError> {
    let vote = blocking(&state, move |engine| engine.initiate_promotion(&member)).await?;
    state.record(|m| m.promotions_initiated.inc());
    Ok((StatusCode::CREATED, Json(vote)))
}

// ── Scheduler ────────────────────────────────────────────────────────────

/// Scheduler report with a one-line summary for humans.
#[derive(Debug, Serialize)]
pub struct SchedulerResponse<T> {
    pub message: String,
    #[serde(flatten)]
    pub report: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetirementResponse {
    pub message: String,
    pub retired: u32,
}

pub async fn select_inquisitor<S: GovernanceStore + 'static>(
    State(state): Shared<S>,
) -> Result<(StatusCode, Json<SchedulerResponse<InquisitorSelection>>), RpcError> {
    let selection = blocking(&state, |engine| engine.select_inquisitor()).await?;
    let (status, message) = match &selection {
        InquisitorSelection::NoCandidates => (
            StatusCode::OK,
            "There are no candidates for the role of Inquisitor.".to_string(),
        ),
        InquisitorSelection::Selected { member, vote } => {
            state.record(|m| m.inquisitor_rotations.inc());
            (
                StatusCode::CREATED,
                format!(
                    "New Inquisitor: {member}. Created a {} vote in the nomination phase.",
                    vote.category
                ),
            )
        }
    };
    Ok((
        status,
        Json(SchedulerResponse {
            message,
            report: selection,
        }),
    ))
}

pub async fn close_vote<S: GovernanceStore + 'static>(
    State(state): Shared<S>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<SchedulerResponse<CloseReport>>, RpcError> {
    let Path(id) = path?;
    let report = blocking(&state, move |engine| engine.close_vote(VoteId::new(id))).await?;
    if report.transition.closed_now() {
        state.record(|m| m.votes_closed.inc());
    }
    Ok(Json(SchedulerResponse {
        message: close_message(&report),
        report,
    }))
}

fn close_message(report: &CloseReport) -> String {
    let id = report.vote.id;
    match report.transition {
        Transition::AlreadyClosed { outcome } => format!("vote {id} is already closed: {outcome}"),
        Transition::NominationOpen => format!("vote {id} is in its nomination phase"),
        Transition::VotingOpen => format!("vote {id} is active"),
        Transition::Expired => format!("vote {id} ended without nomination"),
        Transition::Tallied { outcome, .. } => format!("vote {id} is over. Result: {outcome}"),
    }
}

pub async fn close_due_votes<S: GovernanceStore + 'static>(
    State(state): Shared<S>,
) -> Result<Json<SchedulerResponse<DueSweep>>, RpcError> {
    let sweep = blocking(&state, |engine| engine.close_due_votes()).await?;
    let closed = sweep.newly_closed() as u64;
    state.record(|m| m.votes_closed.inc_by(closed));
    Ok(Json(SchedulerResponse {
        message: format!("{} due votes closed, {} failed", closed, sweep.failed.len()),
        report: sweep,
    }))
}

pub async fn retire<S: GovernanceStore + 'static>(
    State(state): Shared<S>,
) -> Result<Json<RetirementResponse>, RpcError> {
    let retired = blocking(&state, |engine| engine.retire_expired_top_rank()).await?;
    state.record(|m| m.members_retired.inc_by(u64::from(retired)));
    Ok(Json(RetirementResponse {
        message: format!("{retired} members retired"),
        retired,
    }))
}

// ── Blacklist, health, metrics ───────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct BlacklistResponse {
    pub origin: Origin,
    pub blacklisted: bool,
}

pub async fn blacklist_lookup<S: GovernanceStore + 'static>(
    State(state): Shared<S>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<BlacklistResponse>, RpcError> {
    let Path(raw) = path?;
    let origin = Origin::new(raw);
    let lookup = origin.clone();
    let blacklisted = blocking(&state, move |engine| engine.is_blacklisted(&lookup)).await?;
    Ok(Json(BlacklistResponse {
        origin,
        blacklisted,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn metrics<S: GovernanceStore + 'static>(
    State(state): Shared<S>,
) -> Result<Response, RpcError> {
    let metrics = state.metrics.as_ref().ok_or(RpcError::MetricsDisabled)?;
    let body = metrics.render()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}
