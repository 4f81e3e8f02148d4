//! Data Transfer Objects

mod engine_config;
mod file_report;

pub use engine_config::EngineConfig;
pub use file_report::{FileReport, MatcherFailure};
