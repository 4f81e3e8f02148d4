//! CLI module

mod commands;
mod runner;

pub use commands::{Cli, Commands, SignatureArgs};
pub use runner::run;
