//! Matcher type entity
//!
//! Tags every raw result with the phase that produced it. The declaration
//! order is the phase order: cheapest first.

use std::fmt;

/// The closed set of matching strategies, in increasing cost order
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatcherType {
    /// Matches on the file name extension
    Extension = 0,
    /// Matches on the internal structure of container formats (zip, ...)
    Container = 1,
    /// Matches on byte sequences in the file content
    Byte = 2,
}

impl MatcherType {
    /// Phase order used by the orchestrator
    pub const PHASES: [MatcherType; 3] = [
        MatcherType::Extension,
        MatcherType::Container,
        MatcherType::Byte,
    ];

    /// Returns the persistence tag for this matcher type
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Resolves a persistence tag back into a matcher type
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(MatcherType::Extension),
            1 => Some(MatcherType::Container),
            2 => Some(MatcherType::Byte),
            _ => None,
        }
    }

    /// Returns a short lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            MatcherType::Extension => "extension",
            MatcherType::Container => "container",
            MatcherType::Byte => "byte",
        }
    }
}

impl fmt::Display for MatcherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
