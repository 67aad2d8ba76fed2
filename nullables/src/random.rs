//! Nullable random: scripted selections.

use conclave_types::RandomSource;
use std::sync::Mutex;

/// A deterministic random source for testing.
///
/// Returns the configured picks in order, cycling when exhausted. Each pick
/// is reduced modulo the candidate count so a script stays valid when the
/// candidate set shrinks.
pub struct NullRandom {
    picks: Vec<usize>,
    index: Mutex<usize>,
}

impl NullRandom {
    /// Create with a sequence of deterministic picks.
    pub fn new(picks: Vec<usize>) -> Self {
        Self {
            picks,
            index: Mutex::new(0),
        }
    }

    /// Always pick the same position.
    pub fn constant(pick: usize) -> Self {
        Self::new(vec![pick])
    }

    /// Always pick the first candidate.
    pub fn first() -> Self {
        Self::constant(0)
    }
}

impl RandomSource for NullRandom {
    fn pick_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let mut idx = self.index.lock().unwrap();
        let pick = self.picks.get(*idx % self.picks.len().max(1)).copied().unwrap_or(0);
        *idx += 1;
        Some(pick % len)
    }
}
