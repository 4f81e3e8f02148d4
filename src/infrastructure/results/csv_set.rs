//! CSV result sets
//!
//! One row per identification; a file with several answers spans several
//! consecutive rows and a file with none gets a single row with empty
//! identification columns.

use super::FileRecord;
use crate::domain::entities::ResultFile;
use crate::domain::repositories::{ResultReader, ResultSetError};
use csv::StringRecord;
use std::io::{Read, Write};

pub const CSV_HEADER: [&str; 12] = [
    "filename", "filesize", "modified", "errors", "sha256", "namespace", "id", "format",
    "version", "mime", "basis", "warning",
];
const FILE_COLUMNS: usize = 5;

pub struct CsvResultWriter<W: Write> {
    out: csv::Writer<W>,
}

impl<W: Write> CsvResultWriter<W> {
    pub fn new(out: W) -> Result<Self, ResultSetError> {
        let mut out = csv::Writer::from_writer(out);
        out.write_record(CSV_HEADER)?;
        Ok(Self { out })
    }

    pub fn write(&mut self, record: &FileRecord<'_>) -> Result<(), ResultSetError> {
        let file = [
            record.name.to_string(),
            record.size.to_string(),
            record.modified.clone(),
            record.errors.join("; "),
            record.hash.clone().unwrap_or_default(),
        ];
        if record.identifications.is_empty() {
            let blank = std::iter::repeat_n(String::new(), CSV_HEADER.len() - FILE_COLUMNS);
            self.out.write_record(file.iter().cloned().chain(blank))?;
            return Ok(());
        }
        for id in record.identifications {
            self.out.write_record(file.iter().cloned().chain(id.csv()))?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<W, ResultSetError> {
        self.out.flush()?;
        self.out
            .into_inner()
            .map_err(|e| ResultSetError::Io(e.into_error()))
    }
}

struct Columns {
    filename: usize,
    filesize: Option<usize>,
    modified: Option<usize>,
    hash: Option<usize>,
    id: usize,
}

/// Reads a CSV result set, merging consecutive rows of the same file
pub struct CsvResultReader<R: Read> {
    name: String,
    reader: csv::Reader<R>,
    columns: Columns,
    record: StringRecord,
    pending: Option<ResultFile>,
}

impl<R: Read> CsvResultReader<R> {
    pub fn from_reader(reader: R, name: impl Into<String>) -> Result<Self, ResultSetError> {
        let name = name.into();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers = reader.headers()?.clone();
        let position = |column: &str| headers.iter().position(|h| h.trim() == column);
        let required = |column: &str| {
            position(column).ok_or_else(|| ResultSetError::Malformed {
                source_name: name.clone(),
                record: 0,
                message: format!("missing column {column:?}"),
            })
        };
        let columns = Columns {
            filename: required("filename")?,
            id: required("id")?,
            filesize: position("filesize"),
            modified: position("modified"),
            hash: position("sha256"),
        };
        Ok(Self {
            name,
            reader,
            columns,
            record: StringRecord::new(),
            pending: None,
        })
    }

    fn parse(&self) -> Result<(ResultFile, Option<String>), ResultSetError> {
        let field = |idx: Option<usize>| idx.and_then(|i| self.record.get(i)).unwrap_or("");
        let size = match field(self.columns.filesize) {
            "" => 0,
            text => text.parse::<u64>().map_err(|_| ResultSetError::Malformed {
                source_name: self.name.clone(),
                record: self.record.position().map_or(0, |p| p.record()),
                message: format!("bad filesize {text:?}"),
            })?,
        };
        let file = ResultFile::new(field(Some(self.columns.filename)))
            .with_size(size)
            .with_modified(field(self.columns.modified))
            .with_hash(field(self.columns.hash));
        let id = Some(field(Some(self.columns.id)))
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        Ok((file, id))
    }
}

impl<R: Read> ResultReader for CsvResultReader<R> {
    fn next_file(&mut self) -> Result<Option<ResultFile>, ResultSetError> {
        while self.reader.read_record(&mut self.record)? {
            let (mut file, id) = self.parse()?;
            if let Some(pending) = self.pending.as_mut().filter(|p| p.path == file.path) {
                pending.ids.extend(id);
                continue;
            }
            file.ids.extend(id);
            if let Some(done) = self.pending.replace(file) {
                return Ok(Some(done));
            }
        }
        Ok(self.pending.take())
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
