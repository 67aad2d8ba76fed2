//! Timestamp type and the clock seam.
//!
//! Timestamps are Unix epoch seconds (UTC). Every deadline in the vote
//! lifecycle is compared against a [`Clock`] reading, never against a timer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub const SECS_PER_HOUR: u64 = 3_600;
pub const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the current system time as a `Timestamp`.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_secs();
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// This timestamp shifted forward by `secs`, saturating at `u64::MAX`.
    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// This timestamp shifted forward by whole hours.
    pub fn plus_hours(&self, hours: u64) -> Self {
        self.plus_secs(hours.saturating_mul(SECS_PER_HOUR))
    }

    /// Seconds elapsed since this timestamp (relative to `now`).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Whether this timestamp + duration has passed relative to `now`.
    pub fn has_expired(&self, duration_secs: u64, now: Timestamp) -> bool {
        now.0 >= self.0.saturating_add(duration_secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Source of "now" for the governance core.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_hours_adds_seconds() {
        assert_eq!(Timestamp::new(100).plus_hours(2).as_secs(), 100 + 7_200);
    }

    #[test]
    fn plus_secs_saturates() {
        assert_eq!(Timestamp::new(u64::MAX - 1).plus_secs(10).as_secs(), u64::MAX);
    }

    #[test]
    fn has_expired_is_inclusive_at_boundary() {
        let start = Timestamp::new(1_000);
        assert!(!start.has_expired(50, Timestamp::new(1_049)));
        assert!(start.has_expired(50, Timestamp::new(1_050)));
    }

    #[test]
    fn elapsed_since_never_underflows() {
        assert_eq!(Timestamp::new(500).elapsed_since(Timestamp::new(100)), 0);
    }
}
