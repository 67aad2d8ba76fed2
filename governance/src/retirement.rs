//! Retirement sweep for members who held the top rank past their tenure.

use conclave_store::WriteTxn;
use conclave_types::Timestamp;
use tracing::info;

use crate::consequence::deactivate_and_blacklist;
use crate::error::GovernanceError;
use crate::params::GovernanceParams;

const RETIREMENT_REASON: &str = "Top rank tenure expired";

/// Deactivate every active top-rank member whose tenure has run out and
/// blacklist their known origin. Returns how many were retired.
///
/// Retired members are inactive afterwards, so a second run finds nobody.
pub fn retire_expired_top_rank(
    txn: &mut dyn WriteTxn,
    params: &GovernanceParams,
    now: Timestamp,
) -> Result<u32, GovernanceError> {
    let tenure = params.top_rank_tenure_secs();
    let expired: Vec<_> = txn
        .members()?
        .into_iter()
        .filter(|m| m.active && m.rank.is_top() && m.rank_assigned_at.has_expired(tenure, now))
        .collect();

    let mut retired = 0;
    for mut member in expired {
        deactivate_and_blacklist(txn, &mut member, RETIREMENT_REASON, now)?;
        info!(
            member = %member.id,
            held_since = %member.rank_assigned_at,
            "retired top-rank member"
        );
        retired += 1;
    }
    Ok(retired)
}
