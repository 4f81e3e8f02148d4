//! Application layer
//!
//! The identification engine, reconciliation of result sets, and the
//! DTOs exchanged with the presentation layer.

pub mod dto;
mod engine;
pub mod reconcile;

pub use engine::{Engine, EngineBuilder};
pub use reconcile::{JoinKey, ReconcileError, Reconciliation, compare, compare_readers};
