//! CLI commands using clap

use crate::application::JoinKey;
use crate::application::dto::EngineConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// idforge - file format identification
///
/// Identifies files against compiled PRONOM-style signatures and compares
/// result sets from different runs.
#[derive(Parser, Debug)]
#[command(name = "idforge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Identify file formats and compare identification runs", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where to find signature data
#[derive(Args, Debug, Clone, Default)]
pub struct SignatureArgs {
    /// Signature home directory
    #[arg(long)]
    pub home: Option<PathBuf>,

    /// Signature file name inside the home directory
    #[arg(long = "sig")]
    pub signature: Option<String>,

    /// Use the Archivematica build settings
    #[arg(long)]
    pub archivematica: bool,
}

impl SignatureArgs {
    /// Resolves the flags into an engine configuration
    pub fn config(&self) -> EngineConfig {
        let mut config = if self.archivematica {
            EngineConfig::archivematica()
        } else {
            EngineConfig::default()
        };
        if let Some(home) = &self.home {
            config = config.with_home(home.clone());
        }
        if let Some(signature) = &self.signature {
            config = config.with_signature(signature.clone());
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile signature definitions into a signature file
    Build {
        #[command(flatten)]
        signatures: SignatureArgs,

        /// Definition files; the first is the base, the rest extend it
        #[arg(long = "definition")]
        definitions: Vec<PathBuf>,

        /// Output signature file (defaults to the configured signature path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only match on file name extensions
        #[arg(long)]
        extension_only: bool,
    },

    /// Identify files and directories
    Identify {
        #[command(flatten)]
        signatures: SignatureArgs,

        /// Write a JSON result set
        #[arg(long, conflicts_with = "csv")]
        json: bool,

        /// Write a CSV result set
        #[arg(long)]
        csv: bool,

        /// Record a SHA-256 hash of every file
        #[arg(long)]
        hash: bool,

        /// Files or directories to identify
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Compare result sets and list the files whose answers differ
    Compare {
        /// Join entries on: path, filename, filename-size, filename-mod,
        /// filename-hash or hash
        #[arg(short, long, default_value = "path")]
        join: JoinKey,

        /// Result sets (JSON or CSV), at least two
        results: Vec<PathBuf>,
    },

    /// Describe a signature file
    Inspect {
        #[command(flatten)]
        signatures: SignatureArgs,
    },
}
