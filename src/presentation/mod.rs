//! Presentation layer
//!
//! The command-line interface.

pub mod cli;
