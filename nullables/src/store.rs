//! Nullable store: thread-safe in-memory governance storage for testing.

use conclave_store::{GovernanceStore, ReadTxn, StoreError, WriteTxn};
use conclave_types::{Ballot, BlacklistEntry, Member, MemberId, Origin, Vote, VoteId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Clone, Debug)]
struct State {
    members: BTreeMap<MemberId, Member>,
    votes: BTreeMap<VoteId, Vote>,
    ballots: BTreeMap<(VoteId, MemberId), Ballot>,
    blacklist: BTreeMap<Origin, BlacklistEntry>,
    inquisitor: Option<MemberId>,
    next_vote_id: u64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            members: BTreeMap::new(),
            votes: BTreeMap::new(),
            ballots: BTreeMap::new(),
            blacklist: BTreeMap::new(),
            inquisitor: None,
            next_vote_id: 1,
        }
    }
}

/// An in-memory governance store for testing.
///
/// One mutex guards the whole state, so writes are serialised exactly as
/// with LMDB. A write closure runs against a scratch copy that replaces the
/// committed state only when the closure returns `Ok`.
#[derive(Default)]
pub struct NullStore {
    state: Mutex<State>,
    commits: AtomicUsize,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a member outside of any engine operation.
    pub fn seed_member(&self, member: Member) {
        self.state
            .lock()
            .unwrap()
            .members
            .insert(member.id.clone(), member);
    }

    /// Insert or replace a vote outside of any engine operation, bumping the
    /// id counter past it.
    pub fn seed_vote(&self, vote: Vote) {
        let mut state = self.state.lock().unwrap();
        state.next_vote_id = state.next_vote_id.max(vote.id.as_u64() + 1);
        state.votes.insert(vote.id, vote);
    }

    pub fn member(&self, id: &str) -> Option<Member> {
        self.state
            .lock()
            .unwrap()
            .members
            .get(&MemberId::new(id))
            .cloned()
    }

    pub fn vote_count(&self) -> usize {
        self.state.lock().unwrap().votes.len()
    }

    pub fn blacklist_len(&self) -> usize {
        self.state.lock().unwrap().blacklist.len()
    }

    /// Number of write transactions that committed.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

impl GovernanceStore for NullStore {
    fn read<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<R, E>,
        E: From<StoreError>,
    {
        let state = self.state.lock().unwrap();
        f(&*state)
    }

    fn write<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<R, E>,
        E: From<StoreError>,
    {
        let mut committed = self.state.lock().unwrap();
        let mut scratch = committed.clone();
        let out = f(&mut scratch)?;
        *committed = scratch;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(out)
    }
}

impl ReadTxn for State {
    fn member(&self, id: &MemberId) -> Result<Option<Member>, StoreError> {
        Ok(self.members.get(id).cloned())
    }

    fn members(&self) -> Result<Vec<Member>, StoreError> {
        Ok(self.members.values().cloned().collect())
    }

    fn vote(&self, id: VoteId) -> Result<Option<Vote>, StoreError> {
        Ok(self.votes.get(&id).cloned())
    }

    fn votes(&self) -> Result<Vec<Vote>, StoreError> {
        Ok(self.votes.values().cloned().collect())
    }

    fn ballot(&self, vote: VoteId, voter: &MemberId) -> Result<Option<Ballot>, StoreError> {
        Ok(self.ballots.get(&(vote, voter.clone())).cloned())
    }

    fn ballots(&self, vote: VoteId) -> Result<Vec<Ballot>, StoreError> {
        Ok(self
            .ballots
            .values()
            .filter(|b| b.vote == vote)
            .cloned()
            .collect())
    }

    fn blacklist_entry(&self, origin: &Origin) -> Result<Option<BlacklistEntry>, StoreError> {
        Ok(self.blacklist.get(origin).cloned())
    }

    fn inquisitor(&self) -> Result<Option<MemberId>, StoreError> {
        Ok(self.inquisitor.clone())
    }
}

impl WriteTxn for State {
    fn put_member(&mut self, member: &Member) -> Result<(), StoreError> {
        self.members.insert(member.id.clone(), member.clone());
        Ok(())
    }

    fn allocate_vote_id(&mut self) -> Result<VoteId, StoreError> {
        let id = VoteId::new(self.next_vote_id);
        self.next_vote_id += 1;
        Ok(id)
    }

    fn put_vote(&mut self, vote: &Vote) -> Result<(), StoreError> {
        self.votes.insert(vote.id, vote.clone());
        Ok(())
    }

    fn insert_ballot(&mut self, ballot: &Ballot) -> Result<(), StoreError> {
        let key = (ballot.vote, ballot.voter.clone());
        if self.ballots.contains_key(&key) {
            return Err(StoreError::Duplicate(format!(
                "ballot by {} on vote {}",
                ballot.voter, ballot.vote
            )));
        }
        self.ballots.insert(key, ballot.clone());
        Ok(())
    }

    fn insert_blacklist_entry(&mut self, entry: &BlacklistEntry) -> Result<bool, StoreError> {
        if self.blacklist.contains_key(&entry.origin) {
            return Ok(false);
        }
        self.blacklist.insert(entry.origin.clone(), entry.clone());
        Ok(true)
    }

    fn set_inquisitor(&mut self, member: Option<&MemberId>) -> Result<(), StoreError> {
        self.inquisitor = member.cloned();
        Ok(())
    }
}
