//! Singleton values kept in the `meta` database.
//!
//! - `schema_version`: little-endian u32, stamped when the environment is
//!   created. Opening a database written by a newer build is refused.
//! - `next_vote_id`: big-endian u64 counter for vote id allocation.
//! - `inquisitor`: member id of the current Inquisitor, absent when the
//!   role is vacant.

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};

use crate::LmdbError;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

pub(crate) const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";
pub(crate) const NEXT_VOTE_ID_KEY: &[u8] = b"next_vote_id";
pub(crate) const INQUISITOR_KEY: &[u8] = b"inquisitor";

pub(crate) fn ensure_schema_version(
    wtxn: &mut RwTxn,
    meta_db: Database<Bytes, Bytes>,
) -> Result<(), LmdbError> {
    let stored = schema_version(&*wtxn, meta_db)?;
    match stored {
        None => {
            meta_db.put(wtxn, SCHEMA_VERSION_KEY, &CURRENT_SCHEMA_VERSION.to_le_bytes())?;
            tracing::info!(version = CURRENT_SCHEMA_VERSION, "initialised database schema");
            Ok(())
        }
        Some(v) if v > CURRENT_SCHEMA_VERSION => Err(LmdbError::SchemaVersion {
            found: v,
            supported: CURRENT_SCHEMA_VERSION,
        }),
        Some(v) => {
            tracing::debug!(version = v, "database schema is up to date");
            Ok(())
        }
    }
}

pub(crate) fn schema_version(
    txn: &RoTxn,
    meta_db: Database<Bytes, Bytes>,
) -> Result<Option<u32>, LmdbError> {
    match meta_db.get(txn, SCHEMA_VERSION_KEY)? {
        Some(bytes) => {
            let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                LmdbError::Serialization("schema_version has unexpected byte length".to_string())
            })?;
            Ok(Some(u32::from_le_bytes(arr)))
        }
        None => Ok(None),
    }
}

/// Read the next vote id counter. Missing means no vote was ever created.
pub(crate) fn next_vote_id(
    txn: &RoTxn,
    meta_db: Database<Bytes, Bytes>,
) -> Result<u64, LmdbError> {
    match meta_db.get(txn, NEXT_VOTE_ID_KEY)? {
        Some(bytes) => {
            let arr: [u8; 8] = bytes.try_into().map_err(|_| {
                LmdbError::Serialization("next_vote_id has unexpected byte length".to_string())
            })?;
            Ok(u64::from_be_bytes(arr))
        }
        None => Ok(1),
    }
}
