//! Domain entities
//!
//! The shared vocabulary exchanged between matchers, identifiers,
//! the orchestrator and the reconciliation engine.

mod identification;
mod match_result;
mod matcher_type;
mod priority;
mod result_file;
mod signature_set;

pub use identification::{Confidence, Identification};
pub use match_result::MatchResult;
pub use matcher_type::MatcherType;
pub use priority::PriorityList;
pub use result_file::ResultFile;
pub use signature_set::{
    Anchor, ByteSignature, ContainerKind, ContainerSignature, Segment, SignatureSet,
};
