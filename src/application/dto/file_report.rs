//! Per-file identification report DTO

use crate::domain::entities::{Identification, MatcherType};
use std::fmt;

/// A matcher that could not start on a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherFailure {
    pub matcher_type: MatcherType,
    pub message: String,
}

impl fmt::Display for MatcherFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} matcher: {}", self.matcher_type, self.message)
    }
}

/// Everything the engine concluded about one file
///
/// `identifications` is ranked strongest first. A non-empty `degraded`
/// list means some matchers did not contribute, so the answer may be
/// weaker than a full run would give.
#[derive(Debug, Default)]
pub struct FileReport {
    pub name: String,
    pub identifications: Vec<Box<dyn Identification>>,
    pub degraded: Vec<MatcherFailure>,
    /// The answer is a container or archive format
    pub archive: bool,
}

impl FileReport {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    /// Identity strings of every identification, in rank order
    pub fn ids(&self) -> Vec<&str> {
        self.identifications.iter().map(|id| id.id()).collect()
    }

    /// Degradation messages, one per failed matcher
    pub fn errors(&self) -> Vec<String> {
        self.degraded.iter().map(ToString::to_string).collect()
    }
}
