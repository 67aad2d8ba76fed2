//! Abstract storage traits for conclave.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The governance core depends only on the traits.
//!
//! Access always goes through [`GovernanceStore::read`] or
//! [`GovernanceStore::write`], which hand a transaction view to a closure.
//! A write closure either commits as a whole or not at all.

pub mod error;
pub mod governance;

pub use error::StoreError;
pub use governance::GovernanceStore;

use conclave_types::{Ballot, BlacklistEntry, Member, MemberId, Origin, Vote, VoteId};

/// Consistent read view over governance state.
pub trait ReadTxn {
    fn member(&self, id: &MemberId) -> Result<Option<Member>, StoreError>;

    /// All members, ordered by id.
    fn members(&self) -> Result<Vec<Member>, StoreError>;

    fn vote(&self, id: VoteId) -> Result<Option<Vote>, StoreError>;

    /// All votes, ordered by id.
    fn votes(&self) -> Result<Vec<Vote>, StoreError>;

    fn ballot(&self, vote: VoteId, voter: &MemberId) -> Result<Option<Ballot>, StoreError>;

    /// Every ballot cast on `vote`.
    fn ballots(&self, vote: VoteId) -> Result<Vec<Ballot>, StoreError>;

    fn blacklist_entry(&self, origin: &Origin) -> Result<Option<BlacklistEntry>, StoreError>;

    /// The current Inquisitor, if the role is held.
    fn inquisitor(&self) -> Result<Option<MemberId>, StoreError>;
}

/// Writable transaction view (extends ReadTxn). Reads observe earlier
/// writes made through the same transaction.
pub trait WriteTxn: ReadTxn {
    /// Insert or replace a member record.
    fn put_member(&mut self, member: &Member) -> Result<(), StoreError>;

    /// Hand out the next vote id. Ids are never reused.
    fn allocate_vote_id(&mut self) -> Result<VoteId, StoreError>;

    /// Insert or replace a vote record.
    fn put_vote(&mut self, vote: &Vote) -> Result<(), StoreError>;

    /// Record a ballot. Fails with [`StoreError::Duplicate`] if the
    /// `(vote, voter)` pair already has one.
    fn insert_ballot(&mut self, ballot: &Ballot) -> Result<(), StoreError>;

    /// Record a blacklist entry. Returns `false` without touching the
    /// existing entry when the origin is already blacklisted.
    fn insert_blacklist_entry(&mut self, entry: &BlacklistEntry) -> Result<bool, StoreError>;

    /// Point the Inquisitor role at `member`, or clear it.
    fn set_inquisitor(&mut self, member: Option<&MemberId>) -> Result<(), StoreError>;
}
