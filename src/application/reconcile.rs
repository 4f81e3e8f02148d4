//! Result set reconciliation
//!
//! Joins the file entries of several result sets on a key and writes the
//! rows whose identifications disagree as CSV. Each row is the first path
//! seen for the key followed by one column per result set holding the
//! sorted, `;`-joined identity strings, or `MISSING`.

use crate::domain::entities::ResultFile;
use crate::domain::repositories::{ResultReader, ResultSetError};
use crate::infrastructure::results::open_result_set;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

pub const MISSING: &str = "MISSING";
pub const COMPLETE_MATCH: &str = "COMPLETE MATCH";

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("At least two result sets must be provided for comparison; got {0}")]
    TooFewInputs(usize),

    #[error(transparent)]
    ResultSet(#[from] ResultSetError),

    #[error("Failed to write comparison: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// How entries from different result sets are matched up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoinKey {
    #[default]
    Path,
    Filename,
    FilenameSize,
    FilenameMod,
    FilenameHash,
    Hash,
}

impl JoinKey {
    pub const ALL: [JoinKey; 6] = [
        JoinKey::Path,
        JoinKey::Filename,
        JoinKey::FilenameSize,
        JoinKey::FilenameMod,
        JoinKey::FilenameHash,
        JoinKey::Hash,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            JoinKey::Path => "path",
            JoinKey::Filename => "filename",
            JoinKey::FilenameSize => "filename-size",
            JoinKey::FilenameMod => "filename-mod",
            JoinKey::FilenameHash => "filename-hash",
            JoinKey::Hash => "hash",
        }
    }

    /// Computes the join key of `file`
    pub fn key(&self, file: &ResultFile) -> String {
        match self {
            JoinKey::Path => file.path.clone(),
            JoinKey::Filename => file.base_name().to_string(),
            JoinKey::FilenameSize => format!("{}{}", file.base_name(), file.size),
            JoinKey::FilenameMod => format!("{}{}", file.base_name(), file.modified),
            JoinKey::FilenameHash => format!("{}{}", file.base_name(), file.hash),
            JoinKey::Hash => file.hash.clone(),
        }
    }
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JoinKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JoinKey::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = JoinKey::ALL.iter().map(|k| k.name()).collect();
                format!("unknown join {s:?}; expected one of {}", names.join(", "))
            })
    }
}

/// Counts from one reconciliation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Distinct join keys seen across all sets
    pub rows: usize,
    /// Rows written because they did not match
    pub mismatched: usize,
}

impl Reconciliation {
    pub fn is_complete_match(&self) -> bool {
        self.rows > 0 && self.mismatched == 0
    }
}

/// Compares the result sets at `paths`
///
/// Every set is opened before any is read, so an unreadable input aborts
/// the run before anything is written.
pub fn compare<W, P>(w: W, join: JoinKey, paths: &[P]) -> Result<Reconciliation, ReconcileError>
where
    W: Write,
    P: AsRef<Path>,
{
    if paths.len() < 2 {
        return Err(ReconcileError::TooFewInputs(paths.len()));
    }
    let readers = paths
        .iter()
        .map(|p| open_result_set(p.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    compare_readers(w, join, readers)
}

/// Compares already opened result sets
pub fn compare_readers<W: Write>(
    mut w: W,
    join: JoinKey,
    mut readers: Vec<Box<dyn ResultReader>>,
) -> Result<Reconciliation, ReconcileError> {
    if readers.len() < 2 {
        return Err(ReconcileError::TooFewInputs(readers.len()));
    }
    let width = readers.len() + 1;
    let mut order: Vec<String> = Vec::new();
    let mut rows: HashMap<String, Vec<String>> = HashMap::new();

    for (set, reader) in readers.iter_mut().enumerate() {
        let mut entries = 0usize;
        while let Some(file) = reader.next_file()? {
            entries += 1;
            let row = rows.entry(join.key(&file)).or_insert_with_key(|key| {
                order.push(key.clone());
                let mut row = vec![MISSING.to_string(); width];
                row[0] = file.path.clone();
                row
            });
            row[set + 1] = id_column(&file.ids);
        }
        debug!("Read {} entries from {}", entries, reader.source_name());
    }

    let mut summary = Reconciliation {
        rows: order.len(),
        mismatched: 0,
    };
    {
        let mut out = csv::Writer::from_writer(&mut w);
        for key in &order {
            let row = &rows[key];
            if !row_matches(row) {
                summary.mismatched += 1;
                out.write_record(row)?;
            }
        }
        out.flush()?;
    }
    if summary.is_complete_match() {
        w.write_all(COMPLETE_MATCH.as_bytes())?;
    }
    w.flush()?;

    info!(
        "Compared {} sets on {}: {} keys, {} mismatched",
        readers.len(),
        join,
        summary.rows,
        summary.mismatched
    );
    Ok(summary)
}

/// Sorted, deduplicated identity strings joined with `;`
fn id_column(ids: &[String]) -> String {
    let mut ids: Vec<&str> = ids.iter().map(String::as_str).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.join(";")
}

/// A row matches when at least two sets contributed and all agree
fn row_matches(row: &[String]) -> bool {
    if row.len() < 3 {
        return false;
    }
    row[2..].iter().all(|col| *col == row[1])
}
