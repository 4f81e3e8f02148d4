//! Raw match result entity

/// A raw hit emitted by a matcher
///
/// `index` is the matcher-internal slot of the signature that matched;
/// `basis` is a human readable account of why it matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    index: usize,
    basis: String,
}

impl MatchResult {
    /// Creates a new result
    pub fn new(index: usize, basis: impl Into<String>) -> Self {
        Self {
            index,
            basis: basis.into(),
        }
    }

    /// Returns the signature slot that matched
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the provenance text
    pub fn basis(&self) -> &str {
        &self.basis
    }
}
