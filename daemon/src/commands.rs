//! Engine construction and the scheduler one-shot commands.

use std::sync::Arc;

use anyhow::Context;
use conclave_governance::{GovernanceEngine, OsRandom};
use conclave_store::GovernanceStore;
use conclave_store_lmdb::LmdbEnvironment;
use conclave_types::{Member, SystemClock, VoteId};
use serde_json::Value;
use tracing::info;

use crate::config::DaemonConfig;

/// Named databases plus headroom.
const LMDB_MAX_DBS: u32 = 8;

/// Open the LMDB environment and build the engine it backs.
pub fn open_engine(config: &DaemonConfig) -> anyhow::Result<GovernanceEngine<LmdbEnvironment>> {
    let registry = config.registry()?;
    let env = LmdbEnvironment::open(&config.data_dir, LMDB_MAX_DBS, config.lmdb_map_size)
        .with_context(|| format!("failed to open LMDB at {}", config.data_dir.display()))?;
    info!(
        data_dir = %config.data_dir.display(),
        categories = registry.len(),
        "store opened"
    );
    Ok(GovernanceEngine::new(
        Arc::new(env),
        registry,
        config.governance.clone(),
        Arc::new(SystemClock),
        Arc::new(OsRandom),
    ))
}

/// A single scheduler or administrative action run outside the server.
#[derive(Clone, Debug)]
pub enum Job {
    SelectInquisitor,
    CloseVote(VoteId),
    CloseDue,
    Retire,
    Enroll(Member),
}

/// Run `job` and return its report as JSON.
pub fn run_job<S: GovernanceStore>(
    engine: &GovernanceEngine<S>,
    job: Job,
) -> anyhow::Result<Value> {
    let report = match job {
        Job::SelectInquisitor => serde_json::to_value(engine.select_inquisitor()?)?,
        Job::CloseVote(id) => serde_json::to_value(engine.close_vote(id)?)?,
        Job::CloseDue => serde_json::to_value(engine.close_due_votes()?)?,
        Job::Retire => serde_json::json!({ "retired": engine.retire_expired_top_rank()? }),
        Job::Enroll(member) => {
            let id = member.id.clone();
            engine.enroll_member(member)?;
            serde_json::to_value(engine.member(&id)?)?
        }
    };
    Ok(report)
}
