//! Identification entity
//!
//! The final, renderable answer an identifier gives for a file.

use serde::Serialize;
use std::fmt;

/// How strong the evidence behind an identification is
///
/// Ordered weakest to strongest so that sorting descending ranks answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Only the file name extension agreed
    Tentative,
    /// A byte signature matched the content
    Signature,
    /// The internal structure of a container matched
    Structural,
}

impl Confidence {
    /// Returns a short lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Confidence::Tentative => "tentative",
            Confidence::Signature => "signature",
            Confidence::Structural => "structural",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A finalized format match produced by a recorder
///
/// Implementations are immutable once reported.
pub trait Identification: Send + Sync + fmt::Debug {
    /// Short identity text, e.g. `fmt/43`
    ///
    /// This is also the string reconciliation compares across runs.
    fn id(&self) -> &str;

    /// Namespace of the identifier that produced this answer
    fn namespace(&self) -> &str;

    /// Multi-line, human oriented rendering
    fn long_text(&self) -> String;

    /// JSON rendering
    fn json(&self) -> serde_json::Value;

    /// CSV rendering, one field per column
    fn csv(&self) -> Vec<String>;

    /// Strength of the evidence behind this answer
    fn confidence(&self) -> Confidence;

    /// Caveat attached to the answer, if any
    fn warning(&self) -> Option<&str> {
        None
    }
}

impl fmt::Display for dyn Identification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
