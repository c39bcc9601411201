//! Custom error types for the mdict-pack crate.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for all operations in this crate.
///
/// Every variant is fatal: the build pipelines abort on the first error and
/// never skip past a bad record.
#[derive(Debug, Error)]
pub enum BuildError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// An error originating from the SQLite layer.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The data directory is missing or is not a directory.
    #[error("data directory not found: {}", .0.display())]
    DataDirNotFound(PathBuf),

    /// The data directory holds no `*.ndjson` shard files.
    #[error("no .ndjson files found in: {}", .0.display())]
    NoShardFiles(PathBuf),

    /// A shard line failed to parse as JSON.
    #[error("invalid JSON at {}:{}: {message}", .file.display(), .line)]
    InvalidJson {
        file: PathBuf,
        line: u64,
        message: String,
    },

    /// A shard line parsed as JSON, but the top-level value is not an object.
    #[error("expected JSON object at {}:{}", .file.display(), .line)]
    NotAnObject { file: PathBuf, line: u64 },

    /// A shard line's object has no `word` field, or its value is not a
    /// non-empty string.
    #[error("missing/invalid 'word' at {}:{}", .file.display(), .line)]
    InvalidWord { file: PathBuf, line: u64 },

    /// A full scan of the shard files yielded zero entries.
    #[error("no dictionary entries loaded")]
    NoEntries,

    /// A word is too long for the MDX key index, whose per-key length
    /// prefix is 16 bits.
    #[error("word too long for the MDX key index ({0} bytes)")]
    OversizedWord(usize),

    /// The requested batch size is below the minimum of one row.
    #[error("--batch-size must be >= 1")]
    InvalidBatchSize,
}

/// A convenience `Result` type alias using the crate's `BuildError` type.
pub type Result<T> = std::result::Result<T, BuildError>;
