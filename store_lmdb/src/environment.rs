//! LMDB environment: opens the file and owns every database handle.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use conclave_store::StoreError;

use crate::meta;
use crate::write_batch::WriteBatch;
use crate::LmdbError;

/// Named databases inside the environment.
const MEMBERS_DB: &str = "members";
const VOTES_DB: &str = "votes";
const BALLOTS_DB: &str = "ballots";
const BLACKLIST_DB: &str = "blacklist";
const META_DB: &str = "meta";

const REQUIRED_DBS: u32 = 5;

pub struct LmdbEnvironment {
    env: Env,
    /// member id -> bincode(Member)
    pub(crate) members_db: Database<Bytes, Bytes>,
    /// vote id (big-endian) -> bincode(Vote)
    pub(crate) votes_db: Database<Bytes, Bytes>,
    /// vote id (big-endian) ++ voter id -> bincode(Ballot)
    pub(crate) ballots_db: Database<Bytes, Bytes>,
    /// origin -> bincode(BlacklistEntry)
    pub(crate) blacklist_db: Database<Bytes, Bytes>,
    /// singleton values: schema version, vote id counter, Inquisitor pointer
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open (or create) an environment under `path`.
    ///
    /// `max_dbs` is raised to the number of databases this crate needs if
    /// the caller passes less.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)
            .map_err(|e| LmdbError::Heed(format!("create {}: {e}", path.display())))?;

        // SAFETY: the environment is opened once per path by this process and
        // the memory map is never modified outside of LMDB transactions.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs.max(REQUIRED_DBS))
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let members_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some(MEMBERS_DB))?;
        let votes_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some(VOTES_DB))?;
        let ballots_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some(BALLOTS_DB))?;
        let blacklist_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some(BLACKLIST_DB))?;
        let meta_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some(META_DB))?;
        meta::ensure_schema_version(&mut wtxn, meta_db)?;
        wtxn.commit()?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env,
            members_db,
            votes_db,
            ballots_db,
            blacklist_db,
            meta_db,
        })
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Begin a write batch. Dropping it without [`WriteBatch::commit`]
    /// aborts every write made through it.
    pub fn write_batch(&self) -> Result<WriteBatch<'_>, StoreError> {
        WriteBatch::new(self)
    }
}
