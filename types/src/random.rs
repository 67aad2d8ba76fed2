//! Randomness seam for unpredictable selections.

/// Picks uniformly among `len` candidates.
///
/// Production implementations must be cryptographically secure and not
/// seedable by participants; test doubles return scripted indices.
pub trait RandomSource: Send + Sync {
    /// An index in `0..len`, or `None` when `len == 0`.
    fn pick_index(&self, len: usize) -> Option<usize>;
}
