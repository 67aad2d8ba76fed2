//! LMDB storage backend for conclave.
//!
//! Implements the `conclave-store` traits using the `heed` LMDB bindings.
//! Every logical table maps to one named database inside a single
//! environment. LMDB allows one write transaction at a time, which is what
//! serialises concurrent governance writes.

pub mod environment;
pub mod error;
pub mod governance;
pub mod meta;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use governance::LmdbReadTxn;
pub use write_batch::WriteBatch;
