//! # mdict-pack
//!
//! Batch packaging of NDJSON dictionary shards into distributable formats:
//! an MDict 2.0 `.mdx` package and a SQLite `words` database.
//!
//! Records are read from `*.ndjson` shard files (one JSON object per line,
//! keyed by a required `word` field). The MDX pipeline renders each record
//! to an HTML article; the SQLite pipeline stores the raw line so consumers
//! can re-parse the full payload.

use std::path::PathBuf;

pub mod entries;
pub mod error;
pub mod mdx;
pub mod ndjson;
pub mod render;
pub mod sqlite;

// Re-export the main types for convenience
pub use entries::{load_entries, sorted_entries};
pub use error::{BuildError, Result};
pub use mdx::MdxWriter;
pub use ndjson::{Record, RecordIter, shard_files};
pub use sqlite::{WordsDb, build_words_db};

/// Resolves a user-supplied path: `~` expands to the home directory and
/// relative paths are joined to the current working directory.
pub fn resolve_path(value: &str) -> Result<PathBuf> {
    let expanded = if let Some(rest) = value.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(value),
        }
    } else if value == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(value))
    } else {
        PathBuf::from(value)
    };
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(std::env::current_dir()?.join(expanded))
    }
}
