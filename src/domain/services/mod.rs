//! Domain services
//!
//! The polymorphic seams of the engine: matchers produce evidence,
//! identifiers turn it into answers.

mod identifier;
mod matcher;

pub use identifier::{Identifier, Recorder};
pub use matcher::{Matcher, MatcherError, ResultStream};
