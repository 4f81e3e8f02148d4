//! Result-set reader trait
//!
//! Forward-only access to the file entries of a previously written result
//! set, consumed by the reconciliation engine.

use crate::domain::entities::ResultFile;
use std::io;
use thiserror::Error;

/// Errors that can occur when opening or reading a result set
#[derive(Error, Debug)]
pub enum ResultSetError {
    #[error("Cannot open result set {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid JSON result set: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid CSV result set: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed entry in {source_name} at record {record}: {message}")]
    Malformed {
        source_name: String,
        record: u64,
        message: String,
    },

    #[error("Unrecognised result set format: {0}")]
    UnknownFormat(String),
}

/// A finite, forward-only sequence of result file entries
pub trait ResultReader {
    /// Returns the next entry, or `None` once the set is exhausted
    fn next_file(&mut self) -> Result<Option<ResultFile>, ResultSetError>;

    /// Returns a name for the underlying source, used in diagnostics
    fn source_name(&self) -> &str;
}
