//! LMDB implementation of GovernanceStore.

use heed::RoTxn;
use serde::de::DeserializeOwned;

use conclave_store::{GovernanceStore, ReadTxn, StoreError, WriteTxn};
use conclave_types::{Ballot, BlacklistEntry, Member, MemberId, Origin, Vote, VoteId};

use crate::environment::LmdbEnvironment;
use crate::meta;
use crate::LmdbError;

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(bincode::deserialize(bytes).map_err(LmdbError::from)?)
}

/// Ballot key: vote id (big-endian) followed by the voter id bytes, so all
/// ballots of one vote share an 8-byte prefix.
pub(crate) fn ballot_key(vote: VoteId, voter: &MemberId) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + voter.as_str().len());
    key.extend_from_slice(&vote.to_be_bytes());
    key.extend_from_slice(voter.as_str().as_bytes());
    key
}

// ── Reads shared by read and write transactions ─────────────────────────

impl LmdbEnvironment {
    pub(crate) fn get_member(
        &self,
        txn: &RoTxn,
        id: &MemberId,
    ) -> Result<Option<Member>, StoreError> {
        self.members_db
            .get(txn, id.as_str().as_bytes())
            .map_err(LmdbError::from)?
            .map(decode)
            .transpose()
    }

    pub(crate) fn list_members(&self, txn: &RoTxn) -> Result<Vec<Member>, StoreError> {
        let mut out = Vec::new();
        for item in self.members_db.iter(txn).map_err(LmdbError::from)? {
            let (_, value) = item.map_err(LmdbError::from)?;
            out.push(decode(value)?);
        }
        Ok(out)
    }

    pub(crate) fn get_vote(&self, txn: &RoTxn, id: VoteId) -> Result<Option<Vote>, StoreError> {
        self.votes_db
            .get(txn, &id.to_be_bytes())
            .map_err(LmdbError::from)?
            .map(decode)
            .transpose()
    }

    pub(crate) fn list_votes(&self, txn: &RoTxn) -> Result<Vec<Vote>, StoreError> {
        let mut out = Vec::new();
        for item in self.votes_db.iter(txn).map_err(LmdbError::from)? {
            let (_, value) = item.map_err(LmdbError::from)?;
            out.push(decode(value)?);
        }
        Ok(out)
    }

    pub(crate) fn get_ballot(
        &self,
        txn: &RoTxn,
        vote: VoteId,
        voter: &MemberId,
    ) -> Result<Option<Ballot>, StoreError> {
        self.ballots_db
            .get(txn, &ballot_key(vote, voter))
            .map_err(LmdbError::from)?
            .map(decode)
            .transpose()
    }

    pub(crate) fn list_ballots(
        &self,
        txn: &RoTxn,
        vote: VoteId,
    ) -> Result<Vec<Ballot>, StoreError> {
        let prefix = vote.to_be_bytes();
        let mut out = Vec::new();
        for item in self
            .ballots_db
            .prefix_iter(txn, &prefix)
            .map_err(LmdbError::from)?
        {
            let (_, value) = item.map_err(LmdbError::from)?;
            out.push(decode(value)?);
        }
        Ok(out)
    }

    pub(crate) fn get_blacklist_entry(
        &self,
        txn: &RoTxn,
        origin: &Origin,
    ) -> Result<Option<BlacklistEntry>, StoreError> {
        self.blacklist_db
            .get(txn, origin.as_str().as_bytes())
            .map_err(LmdbError::from)?
            .map(decode)
            .transpose()
    }

    pub(crate) fn get_inquisitor(&self, txn: &RoTxn) -> Result<Option<MemberId>, StoreError> {
        let raw = self
            .meta_db
            .get(txn, meta::INQUISITOR_KEY)
            .map_err(LmdbError::from)?;
        match raw {
            Some(bytes) => {
                let id = std::str::from_utf8(bytes).map_err(|e| {
                    StoreError::Corruption(format!("inquisitor pointer is not UTF-8: {e}"))
                })?;
                Ok(Some(MemberId::new(id)))
            }
            None => Ok(None),
        }
    }
}

// ── Read transaction ────────────────────────────────────────────────────

/// Read-only snapshot handed to [`GovernanceStore::read`] closures.
pub struct LmdbReadTxn<'a> {
    txn: RoTxn<'a>,
    env: &'a LmdbEnvironment,
}

impl ReadTxn for LmdbReadTxn<'_> {
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

// ── GovernanceStore ─────────────────────────────────────────────────────

impl GovernanceStore for LmdbEnvironment {
    fn read<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<R, E>,
        E: From<StoreError>,
    {
        let txn = self
            .env()
            .read_txn()
            .map_err(|e| StoreError::from(LmdbError::from(e)))?;
        let view = LmdbReadTxn { txn, env: self };
        f(&view)
    }

    fn write<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<R, E>,
        E: From<StoreError>,
    {
        let mut batch = self.write_batch()?;
        let out = f(&mut batch)?;
        batch.commit()?;
        Ok(out)
    }
}
