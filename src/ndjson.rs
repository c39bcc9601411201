//! Shard discovery and validated NDJSON record streaming.
//!
//! A data directory holds any number of shard files named `*.ndjson`, each a
//! newline-delimited sequence of JSON objects. [`shard_files`] enumerates
//! them in sorted name order and [`RecordIter`] streams their lines through
//! parse-and-validate, yielding one [`Record`] per non-blank line.
//!
//! Validation is strict and fail-fast: the first malformed line ends the
//! stream with an error naming the file and 1-based line number. There is no
//! skip-and-continue mode.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::vec::IntoIter;

use log::{debug, info};
use serde_json::{Map, Value};

use crate::error::{BuildError, Result};

/// One validated dictionary record.
#[derive(Debug, Clone)]
pub struct Record {
    /// The record's dedup key: the object's `word` value, guaranteed to be a
    /// non-empty string. Stored exactly as it appears in the source.
    pub word: String,
    /// The parsed top-level object, field order preserved.
    pub fields: Map<String, Value>,
    /// The source line with surrounding whitespace trimmed. This is the text
    /// the relational pipeline stores verbatim.
    pub raw: String,
}

/// Lists the shard files in `dir`: regular files whose name ends in
/// `.ndjson`, sorted lexicographically by file name.
pub fn shard_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(BuildError::DataDirNotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "ndjson") {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    if files.is_empty() {
        return Err(BuildError::NoShardFiles(dir.to_path_buf()));
    }

    info!("Found {} shard file(s) in {}", files.len(), dir.display());
    Ok(files)
}

/// Streaming iterator over validated records, one shard file at a time.
///
/// Yields `Result<Record>` in file-then-line order. After the first `Err`
/// the iterator is exhausted; callers collect with `?` and abort.
pub struct RecordIter {
    files: IntoIter<PathBuf>,
    current: Option<ShardLines>,
    failed: bool,
}

/// Line reader state for the shard currently being consumed.
struct ShardLines {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: u64,
}

impl RecordIter {
    /// Creates an iterator over the given shard files, consumed in order.
    pub fn new(files: &[PathBuf]) -> Self {
        Self {
            files: files.to_vec().into_iter(),
            current: None,
            failed: false,
        }
    }

    fn fail(&mut self, err: BuildError) -> Option<Result<Record>> {
        self.failed = true;
        Some(Err(err))
    }
}

impl Iterator for RecordIter {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            // Drain the active shard first
            if let Some(current) = self.current.as_mut() {
                while let Some(line) = current.lines.next() {
                    current.line_no += 1;
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => return self.fail(e.into()),
                    };
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    return match parse_record(line, &current.path, current.line_no) {
                        Ok(record) => Some(Ok(record)),
                        Err(e) => self.fail(e),
                    };
                }
                self.current = None;
            }

            // Advance to the next shard
            let path = self.files.next()?;
            debug!("Reading shard {}", path.display());
            match File::open(&path) {
                Ok(file) => {
                    self.current = Some(ShardLines {
                        path,
                        lines: BufReader::new(file).lines(),
                        line_no: 0,
                    });
                }
                Err(e) => return self.fail(e.into()),
            }
        }
    }
}

/// Parses and validates a single trimmed, non-empty shard line.
fn parse_record(line: &str, file: &Path, line_no: u64) -> Result<Record> {
    let value: Value = serde_json::from_str(line).map_err(|e| BuildError::InvalidJson {
        file: file.to_path_buf(),
        line: line_no,
        message: e.to_string(),
    })?;

    let Value::Object(fields) = value else {
        return Err(BuildError::NotAnObject {
            file: file.to_path_buf(),
            line: line_no,
        });
    };

    // The emptiness check does not trim: a whitespace-only word passes and
    // is stored as-is.
    let word = match fields.get("word") {
        Some(Value::String(word)) if !word.is_empty() => word.clone(),
        _ => {
            return Err(BuildError::InvalidWord {
                file: file.to_path_buf(),
                line: line_no,
            });
        }
    };

    Ok(Record {
        word,
        fields,
        raw: line.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: &str) -> Result<Record> {
        parse_record(line, Path::new("shard-000.ndjson"), 7)
    }

    #[test]
    fn parses_minimal_object() {
        let rec = record(r#"{"word":"cat","summary":"a small cat"}"#).unwrap();
        assert_eq!(rec.word, "cat");
        assert_eq!(rec.raw, r#"{"word":"cat","summary":"a small cat"}"#);
        assert_eq!(rec.fields.len(), 2);
    }

    #[test]
    fn preserves_field_order() {
        let rec = record(r#"{"word":"cat","z":1,"a":2}"#).unwrap();
        let keys: Vec<&str> = rec.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, ["word", "z", "a"]);
    }

    #[test]
    fn rejects_invalid_json_with_position() {
        let err = record("{not json").unwrap_err();
        assert!(
            matches!(&err, BuildError::InvalidJson { line: 7, .. }),
            "unexpected error: {err}"
        );
        let message = err.to_string();
        assert!(message.starts_with("invalid JSON at shard-000.ndjson:7: "));
    }

    #[test]
    fn rejects_non_object_payloads() {
        for line in ["[1, 2]", "\"word\"", "42", "true", "null"] {
            let err = record(line).unwrap_err();
            assert_eq!(err.to_string(), "expected JSON object at shard-000.ndjson:7");
        }
    }

    #[test]
    fn rejects_missing_or_invalid_word() {
        for line in [
            r#"{"definition":"no word"}"#,
            r#"{"word":""}"#,
            r#"{"word":42}"#,
            r#"{"word":null}"#,
            r#"{"word":["cat"]}"#,
        ] {
            let err = record(line).unwrap_err();
            assert_eq!(err.to_string(), "missing/invalid 'word' at shard-000.ndjson:7");
        }
    }

    #[test]
    fn accepts_whitespace_word_as_is() {
        let rec = record(r#"{"word":"  "}"#).unwrap();
        assert_eq!(rec.word, "  ");
    }
}
