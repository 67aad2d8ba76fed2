//! Write batching: groups every governance write of one operation into a
//! single LMDB write transaction.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = env.write_batch()?;
//! batch.put_vote(&vote)?;
//! batch.put_member(&target)?;
//! batch.commit()?;
//! ```
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).
//! LMDB admits a single write transaction per environment at a time, so
//! opening a batch blocks until any other writer has finished.

use heed::RwTxn;

use conclave_store::{ReadTxn, StoreError, WriteTxn};
use conclave_types::{Ballot, BlacklistEntry, Member, MemberId, Origin, Vote, VoteId};

use crate::environment::LmdbEnvironment;
use crate::governance::ballot_key;
use crate::meta;
use crate::LmdbError;

pub struct WriteBatch<'a> {
    txn: RwTxn<'a>,
    env: &'a LmdbEnvironment,
}

impl<'a> WriteBatch<'a> {
    /// Begin a new write batch.
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, StoreError> {
        let txn = env.env().write_txn().map_err(LmdbError::from)?;
        Ok(Self { txn, env })
    }

    /// Commit all operations in this batch atomically.
    pub fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

impl ReadTxn for WriteBatch<'_> {
    fn member(&self, id: &MemberId) -> Result<Option<Member>, StoreError> {
        self.env.get_member(&self.txn, id)
    }

    fn members(&self) -> Result<Vec<Member>, StoreError> {
        self.env.list_members(&self.txn)
    }

    fn vote(&self, id: VoteId) -> Result<Option<Vote>, StoreError> {
        self.env.get_vote(&self.txn, id)
    }

    fn votes(&self) -> Result<Vec<Vote>, StoreError> {
        self.env.list_votes(&self.txn)
    }

    fn ballot(&self, vote: VoteId, voter: &MemberId) -> Result<Option<Ballot>, StoreError> {
        self.env.get_ballot(&self.txn, vote, voter)
    }

    fn ballots(&self, vote: VoteId) -> Result<Vec<Ballot>, StoreError> {
        self.env.list_ballots(&self.txn, vote)
    }

    fn blacklist_entry(&self, origin: &Origin) -> Result<Option<BlacklistEntry>, StoreError> {
        self.env.get_blacklist_entry(&self.txn, origin)
    }

    fn inquisitor(&self) -> Result<Option<MemberId>, StoreError> {
        self.env.get_inquisitor(&self.txn)
    }
}

impl WriteTxn for WriteBatch<'_> {
    // ── Members ─────────────────────────────────────────────────────────

    fn put_member(&mut self, member: &Member) -> Result<(), StoreError> {
        let bytes = bincode::serialize(member).map_err(LmdbError::from)?;
        self.env
            .members_db
            .put(&mut self.txn, member.id.as_str().as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Votes ───────────────────────────────────────────────────────────

    fn allocate_vote_id(&mut self) -> Result<VoteId, StoreError> {
        let next = meta::next_vote_id(&self.txn, self.env.meta_db)?;
        let following = next
            .checked_add(1)
            .ok_or_else(|| StoreError::Corruption("vote id counter overflow".to_string()))?;
        self.env
            .meta_db
            .put(&mut self.txn, meta::NEXT_VOTE_ID_KEY, &following.to_be_bytes())
            .map_err(LmdbError::from)?;
        Ok(VoteId::new(next))
    }

    fn put_vote(&mut self, vote: &Vote) -> Result<(), StoreError> {
        let bytes = bincode::serialize(vote).map_err(LmdbError::from)?;
        self.env
            .votes_db
            .put(&mut self.txn, &vote.id.to_be_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Ballots ─────────────────────────────────────────────────────────

    fn insert_ballot(&mut self, ballot: &Ballot) -> Result<(), StoreError> {
        let key = ballot_key(ballot.vote, &ballot.voter);
        let exists = self
            .env
            .ballots_db
            .get(&self.txn, &key)
            .map_err(LmdbError::from)?
            .is_some();
        if exists {
            return Err(StoreError::Duplicate(format!(
                "ballot by {} on vote {}",
                ballot.voter, ballot.vote
            )));
        }
        let bytes = bincode::serialize(ballot).map_err(LmdbError::from)?;
        self.env
            .ballots_db
            .put(&mut self.txn, &key, &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Blacklist ───────────────────────────────────────────────────────

    fn insert_blacklist_entry(&mut self, entry: &BlacklistEntry) -> Result<bool, StoreError> {
        let key = entry.origin.as_str().as_bytes();
        let exists = self
            .env
            .blacklist_db
            .get(&self.txn, key)
            .map_err(LmdbError::from)?
            .is_some();
        if exists {
            return Ok(false);
        }
        let bytes = bincode::serialize(entry).map_err(LmdbError::from)?;
        self.env
            .blacklist_db
            .put(&mut self.txn, key, &bytes)
            .map_err(LmdbError::from)?;
        Ok(true)
    }

    // ── Inquisitor pointer ──────────────────────────────────────────────

    fn set_inquisitor(&mut self, member: Option<&MemberId>) -> Result<(), StoreError> {
        match member {
            Some(id) => {
                self.env
                    .meta_db
                    .put(&mut self.txn, meta::INQUISITOR_KEY, id.as_str().as_bytes())
                    .map_err(LmdbError::from)?;
            }
            None => {
                self.env
                    .meta_db
                    .delete(&mut self.txn, meta::INQUISITOR_KEY)
                    .map_err(LmdbError::from)?;
            }
        }
        Ok(())
    }
}
