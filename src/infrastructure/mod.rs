//! Infrastructure layer
//!
//! Concrete implementations of the domain repositories and services:
//! buffered content, container traversal, matchers, identifiers and
//! result-set readers.

pub mod buffers;
pub mod containers;
pub mod identifiers;
pub mod matchers;
pub mod results;
