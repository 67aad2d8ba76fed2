//! HTTP surface of the governance engine.
//!
//! Provides endpoints for:
//! - Listing and inspecting votes, casting ballots
//! - Ban nominations by the current Inquisitor
//! - Promotion requests
//! - Scheduler triggers (Inquisitor rotation, vote closing, retirement)
//! - Blacklist lookups, liveness and Prometheus metrics
//!
//! Callers are identified by the `X-Member-Id` header set by the upstream
//! identity provider. Requests from a blacklisted origin are refused before
//! they reach a handler.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod server;

pub use error::RpcError;
pub use metrics::GovernanceMetrics;
pub use server::{build_router, AppState, RpcServer};
