//! Governance core for a ranked community.
//!
//! Membership rank, expulsion and promotion are decided by time-boxed votes:
//! NOMINATION → ACTIVE → CLOSED, or NOMINATION → CLOSED (expired).
//!
//! - [`registry`]: per-category policy, resolved once at load
//! - [`eligibility`]: tri-state capability queries behind every action and
//!   behind vote visibility
//! - [`lifecycle`] and [`tally`]: pure phase transitions and outcome rules
//! - [`consequence`]: side effects of a passed vote
//! - [`selector`], [`promotion`], [`retirement`]: scheduler and member
//!   initiated flows
//! - [`engine`]: the facade running each operation as one atomic store write
//!
//! Key principle: a vote closes exactly once. The CLOSED transition and its
//! consequences are written in the same store transaction, and the store
//! serialises writers, so a second concurrent close observes CLOSED.

pub mod consequence;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod params;
pub mod promotion;
pub mod registry;
pub mod retirement;
pub mod selector;
pub mod tally;

pub use consequence::AppliedConsequence;
pub use eligibility::{Actor, Capability};
pub use engine::{CloseReport, DueSweep, GovernanceEngine, VoteDetail};
pub use error::{GovernanceError, RegistryError};
pub use lifecycle::Transition;
pub use params::GovernanceParams;
pub use registry::{
    CategoryConfig, CategoryRegistry, ConsequenceKind, EligibleVoters, PassCondition, VoteCategory,
};
pub use selector::{InquisitorSelection, OsRandom};
pub use tally::Tally;
