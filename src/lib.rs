//! idforge: file format identification
//!
//! Files run through three matcher phases of increasing cost (extension,
//! container, byte). The identifiers turn raw matcher hits into ranked
//! format identifications. Result sets written by separate runs can be
//! reconciled to find where their answers diverge.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod persist;
pub mod presentation;
