//! Reconciliation tests
//!
//! Joins over in-memory result sets plus end-to-end comparisons of CSV and
//! JSON files written to disk.

use idforge::application::reconcile::{COMPLETE_MATCH, MISSING};
use idforge::application::{JoinKey, ReconcileError, compare, compare_readers};
use idforge::domain::entities::ResultFile;
use idforge::domain::repositories::{ResultReader, ResultSetError};
use proptest::prelude::*;
use rstest::*;
use std::collections::HashSet;
use std::path::PathBuf;
use tempfile::TempDir;

// ============================================================================
// Helpers
// ============================================================================

struct VecReader {
    name: String,
    files: std::vec::IntoIter<ResultFile>,
}

impl ResultReader for VecReader {
    fn next_file(&mut self) -> Result<Option<ResultFile>, ResultSetError> {
        Ok(self.files.next())
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

fn set(name: &str, files: Vec<ResultFile>) -> Box<dyn ResultReader> {
    Box::new(VecReader {
        name: name.into(),
        files: files.into_iter(),
    })
}

fn file(path: &str, ids: &[&str]) -> ResultFile {
    ResultFile::new(path).with_ids(ids.iter().copied())
}

fn run(join: JoinKey, sets: Vec<Box<dyn ResultReader>>) -> (String, usize, usize) {
    let mut out = Vec::new();
    let summary = compare_readers(&mut out, join, sets).unwrap();
    (String::from_utf8(out).unwrap(), summary.rows, summary.mismatched)
}

#[fixture]
fn result_dir() -> TempDir {
    TempDir::new().unwrap()
}

// ============================================================================
// In-memory comparisons
// ============================================================================

#[test]
fn test_identical_sets_are_a_complete_match() {
    let (out, rows, mismatched) = run(
        JoinKey::Path,
        vec![
            set("a", vec![file("x", &["fmt/1"]), file("y", &[])]),
            set("b", vec![file("y", &[]), file("x", &["fmt/1"])]),
        ],
    );
    assert_eq!(out, COMPLETE_MATCH);
    assert_eq!((rows, mismatched), (2, 0));
}

#[test]
fn test_disagreement_is_written_as_a_row() {
    let (out, rows, mismatched) = run(
        JoinKey::Path,
        vec![
            set("a", vec![file("x", &["fmt/1"])]),
            set("b", vec![file("x", &["fmt/2"])]),
        ],
    );
    assert_eq!(out, "x,fmt/1,fmt/2\n");
    assert_eq!((rows, mismatched), (1, 1));
}

#[test]
fn test_absent_entry_is_missing() {
    let (out, _, mismatched) = run(
        JoinKey::Path,
        vec![
            set("a", vec![file("x", &["fmt/1"]), file("only-a", &["fmt/3"])]),
            set("b", vec![file("x", &["fmt/1"])]),
        ],
    );
    assert_eq!(out, format!("only-a,fmt/3,{MISSING}\n"));
    assert_eq!(mismatched, 1);
}

#[test]
fn test_id_order_within_a_set_does_not_matter() {
    let (out, _, mismatched) = run(
        JoinKey::Path,
        vec![
            set("a", vec![file("x", &["fmt/2", "fmt/1"])]),
            set("b", vec![file("x", &["fmt/1", "fmt/2"])]),
        ],
    );
    assert_eq!(mismatched, 0);
    assert_eq!(out, COMPLETE_MATCH);
}

#[test]
fn test_rows_keep_first_seen_order_and_first_path() {
    let (out, _, _) = run(
        JoinKey::Filename,
        vec![
            set("a", vec![file("one/b.txt", &["x-fmt/111"]), file("one/a.txt", &["fmt/1"])]),
            set("b", vec![file("two/a.txt", &["fmt/2"]), file("two/b.txt", &[])]),
            set("c", vec![]),
        ],
    );
    assert_eq!(
        out,
        format!(
            "one/b.txt,x-fmt/111,,{MISSING}\none/a.txt,fmt/1,fmt/2,{MISSING}\n"
        )
    );
}

#[test]
fn test_empty_sets_are_not_a_complete_match() {
    let (out, rows, mismatched) = run(JoinKey::Path, vec![set("a", vec![]), set("b", vec![])]);
    assert_eq!(out, "");
    assert_eq!((rows, mismatched), (0, 0));
}

#[rstest]
#[case(JoinKey::Path, 2)]
#[case(JoinKey::Filename, 1)]
#[case(JoinKey::FilenameSize, 2)]
#[case(JoinKey::FilenameMod, 1)]
#[case(JoinKey::FilenameHash, 1)]
#[case(JoinKey::Hash, 1)]
fn test_join_key_decides_which_entries_meet(#[case] join: JoinKey, #[case] expected_rows: usize) {
    let left = ResultFile::new("a/report.pdf")
        .with_size(10)
        .with_modified("2024-01-01T00:00:00Z")
        .with_hash("abcd")
        .with_ids(["fmt/18"]);
    let right = ResultFile::new(r"b\report.pdf")
        .with_size(11)
        .with_modified("2024-01-01T00:00:00Z")
        .with_hash("abcd")
        .with_ids(["fmt/18"]);

    let (_, rows, _) = run(join, vec![set("a", vec![left]), set("b", vec![right])]);
    assert_eq!(rows, expected_rows);
}

#[test]
fn test_single_reader_is_rejected() {
    let mut out = Vec::new();
    let err = compare_readers(&mut out, JoinKey::Path, vec![set("a", vec![])]).unwrap_err();
    assert!(matches!(err, ReconcileError::TooFewInputs(1)));
    assert!(out.is_empty());
}

#[test]
fn test_single_path_is_rejected_before_opening() {
    let mut out = Vec::new();
    let err = compare(&mut out, JoinKey::Path, &["/nonexistent/results.csv"]).unwrap_err();
    assert!(matches!(err, ReconcileError::TooFewInputs(1)));
}

// ============================================================================
// Result set files
// ============================================================================

const CSV_SET: &str = "\
filename,filesize,modified,errors,sha256,namespace,id,format,version,mime,basis,warning
docs/a.pdf,10,2024-01-01T00:00:00Z,,,pronom,fmt/18,PDF,1.4,application/pdf,,
docs/b.odt,20,2024-01-01T00:00:00Z,,,pronom,fmt/290,ODT,,,,
docs/b.odt,20,2024-01-01T00:00:00Z,,,pronom,fmt/291,ODT,,,,
docs/c.bin,5,2024-01-01T00:00:00Z,,,,,,,,,
";

const JSON_SET: &str = r#"{"tool":"idforge","files":[
    {"filename":"docs/a.pdf","filesize":10,"modified":"2024-01-01T00:00:00Z","errors":"","matches":[{"ns":"pronom","id":"fmt/18"}]},
    {"filename":"docs/b.odt","filesize":20,"modified":"2024-01-01T00:00:00Z","errors":"","matches":[{"id":"fmt/291"},{"id":"fmt/290"}]},
    {"filename":"docs/c.bin","filesize":5,"modified":"2024-01-01T00:00:00Z","errors":"","matches":[]}
]}"#;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[rstest]
fn test_csv_and_json_sets_agree(result_dir: TempDir) {
    let csv = write(&result_dir, "run.csv", CSV_SET);
    let json = write(&result_dir, "run.json", JSON_SET);

    let mut out = Vec::new();
    let summary = compare(&mut out, JoinKey::Path, &[&csv, &json]).unwrap();
    assert!(summary.is_complete_match());
    assert_eq!(summary.rows, 3);
    assert_eq!(String::from_utf8(out).unwrap(), COMPLETE_MATCH);
}

#[rstest]
fn test_changed_identification_is_reported(result_dir: TempDir) {
    let csv = write(&result_dir, "run.csv", CSV_SET);
    let changed = JSON_SET.replace(r#"{"ns":"pronom","id":"fmt/18"}"#, r#"{"id":"fmt/19"}"#);
    let json = write(&result_dir, "run.json", &changed);

    let mut out = Vec::new();
    let summary = compare(&mut out, JoinKey::Path, &[csv, json]).unwrap();
    assert_eq!(summary.mismatched, 1);
    assert_eq!(String::from_utf8(out).unwrap(), "docs/a.pdf,fmt/18,fmt/19\n");
}

#[rstest]
fn test_leading_whitespace_still_selects_json(result_dir: TempDir) {
    let first = write(&result_dir, "first.json", &format!("\n\n  {JSON_SET}"));
    let second = write(&result_dir, "second.json", JSON_SET);

    let mut out = Vec::new();
    let summary = compare(&mut out, JoinKey::Filename, &[first, second]).unwrap();
    assert!(summary.is_complete_match());
}

#[rstest]
fn test_unreadable_set_aborts_before_output(result_dir: TempDir) {
    let csv = write(&result_dir, "run.csv", CSV_SET);
    let missing = result_dir.path().join("missing.json");

    let mut out = Vec::new();
    let err = compare(&mut out, JoinKey::Path, &[csv, missing]).unwrap_err();
    assert!(matches!(err, ReconcileError::ResultSet(ResultSetError::Open { .. })));
    assert!(out.is_empty());
}

#[rstest]
fn test_empty_file_is_unknown_format(result_dir: TempDir) {
    let csv = write(&result_dir, "run.csv", CSV_SET);
    let empty = write(&result_dir, "empty", "   \n");

    let err = compare(&mut Vec::new(), JoinKey::Path, &[csv, empty]).unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::ResultSet(ResultSetError::UnknownFormat(_))
    ));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_one_row_per_distinct_key(
        left in prop::collection::vec((0u8..12, 0u8..3), 0..20),
        right in prop::collection::vec((0u8..12, 0u8..3), 0..20),
    ) {
        let to_files = |entries: &[(u8, u8)]| -> Vec<ResultFile> {
            entries
                .iter()
                .map(|(key, id)| file(&format!("f{key}"), &[format!("fmt/{id}").as_str()]))
                .collect()
        };
        let distinct: HashSet<u8> = left.iter().chain(&right).map(|(k, _)| *k).collect();

        let mut out = Vec::new();
        let summary = compare_readers(
            &mut out,
            JoinKey::Path,
            vec![set("l", to_files(&left)), set("r", to_files(&right))],
        )
        .unwrap();

        prop_assert_eq!(summary.rows, distinct.len());
        prop_assert!(summary.mismatched <= summary.rows);
        let text = String::from_utf8(out).unwrap();
        if summary.is_complete_match() {
            prop_assert_eq!(text, COMPLETE_MATCH);
        } else {
            prop_assert_eq!(text.lines().count(), summary.mismatched);
        }
    }
}
