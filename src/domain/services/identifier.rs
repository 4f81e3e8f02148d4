//! Identifier and recorder traits

use crate::domain::entities::{Identification, MatchResult, MatcherType};
use crate::persist::Saver;

/// A family of formats an engine can recognise (e.g. PRONOM)
///
/// Identifiers live for the whole process and own their compiled signature
/// state. `tag` is the one-byte discriminator written ahead of the
/// identifier's state in a signature file.
pub trait Identifier: Send + Sync {
    /// Persistence discriminator (0 = Pronom, at most 8 slots)
    fn tag(&self) -> u8;

    /// Name of this identifier instance
    fn name(&self) -> &str;

    /// Name and details, for display
    fn describe(&self) -> [String; 2];

    /// Creates a fresh recorder for one identification run
    fn recorder(&self) -> Box<dyn Recorder + '_>;

    /// Serializes the identifier, including its tag byte
    fn save(&self, saver: &mut Saver);

    /// Returns the format a result index stands for, if it is one of ours
    fn recognise(&self, matcher_type: MatcherType, index: usize) -> Option<String>;
}

/// Per-run, per-identifier accumulator of raw results
pub trait Recorder {
    /// Offers a result; returns true if this recorder claimed it
    fn record(&mut self, matcher_type: MatcherType, result: &MatchResult) -> bool;

    /// True when enough evidence exists to skip the remaining phases
    fn satisfied(&self) -> bool;

    /// True when the answer this recorder would report is an archive format
    fn is_archive(&self) -> bool {
        false
    }

    /// Drains the recorder into zero or more identifications
    fn report(self: Box<Self>) -> Vec<Box<dyn Identification>>;
}
