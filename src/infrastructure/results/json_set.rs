use super::{FileRecord, ResultSetHeader};
use crate::domain::entities::ResultFile;
use crate::domain::repositories::{ResultReader, ResultSetError};
use serde::Deserialize;
use serde_json::{Value, json};
use std::io::{Read, Write};

/// Streams a JSON result set: header fields, then a `files` array
pub struct JsonResultWriter<W: Write> {
    out: W,
    first: bool,
}

impl<W: Write> JsonResultWriter<W> {
    pub fn new(mut out: W, header: &ResultSetHeader) -> Result<Self, ResultSetError> {
        let head = serde_json::to_string(header)?;
        // Reopen the header object to append the file array.
        let head = head.strip_suffix('}').unwrap_or(&head);
        write!(out, "{head},\"files\":[")?;
        Ok(Self { out, first: true })
    }

    pub fn write(&mut self, record: &FileRecord<'_>) -> Result<(), ResultSetError> {
        let matches: Vec<Value> = record.identifications.iter().map(|id| id.json()).collect();
        let mut file = json!({
            "filename": record.name,
            "filesize": record.size,
            "modified": record.modified,
            "errors": record.errors.join("; "),
            "matches": matches,
        });
        if let Some(hash) = &record.hash {
            file["sha256"] = Value::String(hash.clone());
        }
        if !self.first {
            self.out.write_all(b",")?;
        }
        self.first = false;
        serde_json::to_writer(&mut self.out, &file)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W, ResultSetError> {
        self.out.write_all(b"]}\n")?;
        self.out.flush()?;
        Ok(self.out)
    }
}

#[derive(Deserialize)]
struct JsonResultSet {
    #[serde(default)]
    files: Vec<JsonFile>,
}

#[derive(Deserialize)]
struct JsonFile {
    filename: String,
    #[serde(default)]
    filesize: u64,
    #[serde(default)]
    modified: String,
    #[serde(default)]
    sha256: String,
    #[serde(default)]
    matches: Vec<JsonMatch>,
}

#[derive(Deserialize)]
struct JsonMatch {
    id: String,
}

/// Reads a JSON result set
///
/// The document is parsed whole when the reader is created.
pub struct JsonResultReader {
    name: String,
    files: std::vec::IntoIter<JsonFile>,
}

impl JsonResultReader {
    pub fn from_reader<R: Read>(reader: R, name: impl Into<String>) -> Result<Self, ResultSetError> {
        let set: JsonResultSet = serde_json::from_reader(reader)?;
        Ok(Self {
            name: name.into(),
            files: set.files.into_iter(),
        })
    }
}

impl ResultReader for JsonResultReader {
    fn next_file(&mut self) -> Result<Option<ResultFile>, ResultSetError> {
        Ok(self.files.next().map(|f| {
            ResultFile::new(f.filename)
                .with_size(f.filesize)
                .with_modified(f.modified)
                .with_hash(f.sha256)
                .with_ids(f.matches.into_iter().map(|m| m.id).filter(|id| !id.is_empty()))
        }))
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Confidence, Identification};
    use crate::infrastructure::identifiers::pronom::PronomIdentification;

    fn identification(id: &str) -> Box<dyn Identification> {
        Box::new(PronomIdentification {
            namespace: "pronom".into(),
            id: id.into(),
            format: String::new(),
            version: String::new(),
            mime: String::new(),
            basis: vec![],
            warning: None,
            confidence: Confidence::Signature,
        })
    }

    #[test]
    fn written_sets_read_back() {
        let header = ResultSetHeader {
            tool: "idforge".into(),
            ..Default::default()
        };
        let ids = vec![identification("fmt/1"), identification("fmt/2")];
        let mut writer = JsonResultWriter::new(Vec::new(), &header).unwrap();
        writer
            .write(&FileRecord {
                name: "a.pdf",
                size: 10,
                modified: "2024-01-01T00:00:00Z".into(),
                errors: vec![],
                hash: Some("abcd".into()),
                identifications: &ids,
            })
            .unwrap();
        writer
            .write(&FileRecord {
                name: "b.bin",
                size: 0,
                modified: String::new(),
                errors: vec!["byte matcher: gone".into()],
                hash: None,
                identifications: &[],
            })
            .unwrap();
        let out = writer.finish().unwrap();

        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["tool"], "idforge");
        assert_eq!(value["files"][1]["errors"], "byte matcher: gone");

        let mut reader = JsonResultReader::from_reader(out.as_slice(), "mem").unwrap();
        let a = reader.next_file().unwrap().unwrap();
        assert_eq!(a, ResultFile::new("a.pdf")
            .with_size(10)
            .with_modified("2024-01-01T00:00:00Z")
            .with_hash("abcd")
            .with_ids(["fmt/1", "fmt/2"]));
        let b = reader.next_file().unwrap().unwrap();
        assert!(b.ids.is_empty());
        assert!(reader.next_file().unwrap().is_none());
    }

    #[test]
    fn garbage_is_a_json_error() {
        let err = JsonResultReader::from_reader(&b"{\"files\": 3}"[..], "mem").err();
        assert!(matches!(err, Some(ResultSetError::Json(_))));
    }
}
