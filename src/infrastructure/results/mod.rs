//! Result sets
//!
//! Writers for the JSON and CSV reports produced by an identification run,
//! and the matching readers used by reconciliation.

mod csv_set;
mod json_set;

pub use csv_set::{CsvResultReader, CsvResultWriter, CSV_HEADER};
pub use json_set::{JsonResultReader, JsonResultWriter};

use crate::domain::entities::Identification;
use crate::domain::repositories::{ResultReader, ResultSetError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::SystemTime;

/// Run-level fields written ahead of the file entries
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultSetHeader {
    pub tool: String,
    pub signature: String,
    pub created: String,
    pub identifiers: Vec<IdentifierSummary>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IdentifierSummary {
    pub name: String,
    pub details: String,
}

/// One identified file, ready to be written
#[derive(Debug)]
pub struct FileRecord<'a> {
    pub name: &'a str,
    pub size: u64,
    pub modified: String,
    /// Degraded-matcher messages and read failures
    pub errors: Vec<String>,
    pub hash: Option<String>,
    pub identifications: &'a [Box<dyn Identification>],
}

/// Renders a timestamp the way result sets store it
pub fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Opens a result set, picking the reader from its first non-blank byte
///
/// `{` selects the JSON reader; anything else is read as CSV.
pub fn open_result_set(path: &Path) -> Result<Box<dyn ResultReader>, ResultSetError> {
    let name = path.display().to_string();
    let file = File::open(path).map_err(|source| ResultSetError::Open {
        path: name.clone(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let first = loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break None;
        }
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(pos) => {
                let byte = buf[pos];
                reader.consume(pos);
                break Some(byte);
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    };

    match first {
        Some(b'{') => Ok(Box::new(JsonResultReader::from_reader(reader, name)?)),
        Some(_) => Ok(Box::new(CsvResultReader::from_reader(reader, name)?)),
        None => Err(ResultSetError::UnknownFormat(format!("{name} is empty"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::NamedTempFile;

    fn temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn sniffs_json_and_csv() {
        let json = temp("\n  {\"files\": [{\"filename\": \"a\", \"matches\": [{\"id\": \"fmt/1\"}]}]}");
        let mut reader = open_result_set(json.path()).unwrap();
        assert_eq!(reader.next_file().unwrap().unwrap().ids, vec!["fmt/1"]);

        let csv = temp("filename,filesize,modified,errors,sha256,namespace,id\na,1,,,,pronom,fmt/2\n");
        let mut reader = open_result_set(csv.path()).unwrap();
        assert_eq!(reader.next_file().unwrap().unwrap().ids, vec!["fmt/2"]);
    }

    #[test]
    fn empty_and_missing_files_are_errors() {
        let empty = temp("  \n");
        assert!(matches!(
            open_result_set(empty.path()),
            Err(ResultSetError::UnknownFormat(_))
        ));
        assert!(matches!(
            open_result_set(Path::new("/nonexistent/results.csv")),
            Err(ResultSetError::Open { .. })
        ));
    }

    #[test]
    fn timestamps_are_utc_seconds() {
        let t = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(format_timestamp(t), "2023-11-14T22:13:20Z");
    }
}
