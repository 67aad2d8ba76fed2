//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the governance core (clock, storage,
//! randomness) is abstracted behind a trait. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod random;
pub mod store;

pub use clock::NullClock;
pub use random::NullRandom;
pub use store::NullStore;
