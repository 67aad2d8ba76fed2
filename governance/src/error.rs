use conclave_store::StoreError;
use conclave_types::VoteId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    /// The vote exists but the caller has no standing to see it. Reported to
    /// callers exactly like a missing vote.
    #[error("vote {0} not found")]
    NotVisible(VoteId),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Failures while loading vote category configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("category name must not be empty")]
    EmptyName,

    #[error("category {0} is defined more than once")]
    DuplicateCategory(String),

    #[error("category {0} has an empty eligible voter set")]
    NoEligibleVoters(String),

    #[error("category {0} has a zero-length voting window")]
    ZeroVotingWindow(String),

    #[error("category {0} has a zero-length nomination window")]
    ZeroNominationWindow(String),
}
