//! Matcher trait
//!
//! A matcher scans one candidate file with one strategy and streams raw
//! results. It does not rank what it finds: arbitration belongs to the
//! recorders and the orchestrator.

use crate::domain::entities::{MatchResult, MatcherType, PriorityList, SignatureSet};
use crate::domain::repositories::{Buffer, BufferError};
use crate::persist::Saver;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use thiserror::Error;

/// Stream of raw results for one file
///
/// The stream is complete once every sender is dropped, which the receiver
/// observes as a disconnect.
pub type ResultStream = Receiver<MatchResult>;

/// Errors raised by matchers
///
/// Returned synchronously from `identify` only when scanning cannot begin at
/// all; the orchestrator treats it as a per-matcher, recoverable condition.
#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("Cannot read buffered content: {0}")]
    Buffer(#[from] BufferError),

    #[error("{expected} matcher cannot ingest a {found} signature set")]
    WrongSet {
        expected: MatcherType,
        found: MatcherType,
    },

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Matcher error: {0}")]
    Other(String),
}

/// A pluggable scanning strategy
///
/// # Example
///
/// ```ignore
/// let stream = matcher.identify("report.pdf", buffer)?;
/// for result in stream {
///     println!("{} {}", result.index(), result.basis());
/// }
/// ```
pub trait Matcher: Send + Sync {
    /// The phase this matcher runs in
    fn matcher_type(&self) -> MatcherType;

    /// Starts scanning `buffer` and returns the result stream
    ///
    /// Once a stream is returned the matcher alone is responsible for
    /// completing it. Results need not be ordered by confidence.
    fn identify(&self, name: &str, buffer: Arc<dyn Buffer>) -> Result<ResultStream, MatcherError>;

    /// Ingests a signature batch at build time
    ///
    /// `priorities` is expressed in the set's local indexes. Returns the
    /// total number of signatures now held, not just the batch size.
    fn add(&mut self, set: SignatureSet, priorities: &PriorityList)
        -> Result<usize, MatcherError>;

    /// Serializes the matcher state
    fn save(&self, saver: &mut Saver);

    /// Short description used in logs and `inspect` output
    fn describe(&self) -> String;
}
