//! Governance storage trait.

use crate::{ReadTxn, StoreError, WriteTxn};

/// A store of governance state shared by every concurrent caller.
///
/// `write` closures are serialised against each other: at most one runs at a
/// time, and each sees every write committed before it started. This is the
/// primitive the vote lifecycle relies on for exactly-once closing and for
/// the single-Inquisitor rotation.
pub trait GovernanceStore: Send + Sync {
    /// Run `f` against a consistent snapshot.
    fn read<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<R, E>,
        E: From<StoreError>;

    /// Run `f` as one atomic unit. Everything `f` wrote is committed when it
    /// returns `Ok`, and discarded when it returns `Err`.
    fn write<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<R, E>,
        E: From<StoreError>;
}
