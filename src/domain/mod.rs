//! Domain layer - Core identification vocabulary
//!
//! Entities, the ports to external collaborators, and the matcher /
//! identifier contracts everything else is built against.

pub mod entities;
pub mod repositories;
pub mod services;
