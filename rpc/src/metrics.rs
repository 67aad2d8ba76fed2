//! Prometheus metrics for governance activity.
//!
//! [`GovernanceMetrics`] owns a dedicated [`Registry`] that the `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, Encoder, IntCounter, Opts, Registry, TextEncoder,
};

use crate::error::RpcError;

pub struct GovernanceMetrics {
    pub registry: Registry,

    /// Ballots accepted.
    pub ballots_cast: IntCounter,
    /// Ballot requests refused (not visible, duplicate, window closed).
    pub ballots_rejected: IntCounter,
    /// Votes moved to CLOSED by a close request or sweep.
    pub votes_closed: IntCounter,
    /// Ban nominations made by the Inquisitor.
    pub nominations: IntCounter,
    /// Promotion votes opened.
    pub promotions_initiated: IntCounter,
    /// Top-rank members retired by the tenure sweep.
    pub members_retired: IntCounter,
    /// Inquisitor rotations that selected a member.
    pub inquisitor_rotations: IntCounter,
}

impl GovernanceMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let ballots_cast = register_int_counter_with_registry!(
            Opts::new("conclave_ballots_cast_total", "Total ballots accepted"),
            registry
        )
        .expect("failed to register ballots_cast counter");

        let ballots_rejected = register_int_counter_with_registry!(
            Opts::new(
                "conclave_ballots_rejected_total",
                "Total ballot requests refused"
            ),
            registry
        )
        .expect("failed to register ballots_rejected counter");

        let votes_closed = register_int_counter_with_registry!(
            Opts::new("conclave_votes_closed_total", "Total votes closed"),
            registry
        )
        .expect("failed to register votes_closed counter");

        let nominations = register_int_counter_with_registry!(
            Opts::new("conclave_nominations_total", "Total ban nominations made"),
            registry
        )
        .expect("failed to register nominations counter");

        let promotions_initiated = register_int_counter_with_registry!(
            Opts::new(
                "conclave_promotions_initiated_total",
                "Total promotion votes opened"
            ),
            registry
        )
        .expect("failed to register promotions_initiated counter");

        let members_retired = register_int_counter_with_registry!(
            Opts::new(
                "conclave_members_retired_total",
                "Total top-rank members retired after their tenure"
            ),
            registry
        )
        .expect("failed to register members_retired counter");

        let inquisitor_rotations = register_int_counter_with_registry!(
            Opts::new(
                "conclave_inquisitor_rotations_total",
                "Total Inquisitor rotations that selected a member"
            ),
            registry
        )
        .expect("failed to register inquisitor_rotations counter");

        Self {
            registry,
            ballots_cast,
            ballots_rejected,
            votes_closed,
            nominations,
            promotions_initiated,
            members_retired,
            inquisitor_rotations,
        }
    }

    /// Encode every registered metric in the text exposition format.
    pub fn render(&self) -> Result<String, RpcError> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|e| RpcError::Server(format!("failed to encode metrics: {e}")))?;
        String::from_utf8(buf).map_err(|e| RpcError::Server(format!("metrics not utf-8: {e}")))
    }
}

impl Default for GovernanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}
