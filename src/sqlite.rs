//! SQLite packaging for dictionary records.
//!
//! Rebuilds a single `words` table from scratch on every run:
//!
//! ```text
//! words(word TEXT NOT NULL COLLATE BINARY, definition TEXT NOT NULL)
//! idx_words_word: UNIQUE (word)
//! ```
//!
//! `definition` stores each record's raw NDJSON line, so consumers can
//! re-parse the full payload later. Duplicate words resolve by upsert:
//! the last line read wins.
//!
//! The whole import runs in one transaction; batches only bound how many
//! rows are buffered between statement flushes. An aborted import rolls
//! back to the empty schema.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rusqlite::{Connection, Transaction, params};

use crate::error::Result;
use crate::ndjson::RecordIter;

/// A freshly created words database.
pub struct WordsDb {
    conn: Connection,
}

impl WordsDb {
    /// Creates the database at `path`, replacing any previous file.
    ///
    /// Stale `-wal`/`-shm` sidecars from an interrupted run are removed
    /// along with the database itself. Parent directories are created as
    /// needed.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        remove_stale(path)?;

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        conn.execute_batch(
            "DROP TABLE IF EXISTS words;
             CREATE TABLE words (
                 word TEXT NOT NULL COLLATE BINARY,
                 definition TEXT NOT NULL
             );
             CREATE UNIQUE INDEX idx_words_word ON words(word);",
        )?;
        debug!("Created words table at {}", path.display());

        Ok(Self { conn })
    }

    /// Streams every record from `files` into `words`, upserting by word.
    ///
    /// Rows are buffered up to `batch_size` before each statement flush.
    /// Returns the number of records read, which exceeds the stored row
    /// count exactly when the shards repeat a word.
    pub fn import(&mut self, files: &[PathBuf], batch_size: usize) -> Result<u64> {
        let tx = self.conn.transaction()?;
        let mut batch: Vec<(String, String)> = Vec::new();
        let mut rows_read = 0u64;

        debug!("Importing rows from {} shard file(s)", files.len());
        for record in RecordIter::new(files) {
            let record = record?;
            batch.push((record.word, record.raw));
            rows_read += 1;
            if batch.len() >= batch_size {
                flush_batch(&tx, &mut batch)?;
            }
        }
        flush_batch(&tx, &mut batch)?;
        tx.commit()?;
        Ok(rows_read)
    }

    /// Counts the rows currently stored in `words`.
    pub fn count_words(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM words", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Builds a new database at `out` from the given shard files.
///
/// Returns `(rows_read, rows_in_words)` for the run summary.
pub fn build_words_db(files: &[PathBuf], out: &Path, batch_size: usize) -> Result<(u64, u64)> {
    let mut db = WordsDb::create(out)?;
    let rows_read = db.import(files, batch_size)?;
    let rows_in_words = db.count_words()?;
    info!("Imported {rows_read} row(s), {rows_in_words} distinct word(s)");
    Ok((rows_read, rows_in_words))
}

/// Upserts the buffered rows through one prepared statement and clears the
/// buffer. An empty buffer is a no-op.
fn flush_batch(tx: &Transaction<'_>, batch: &mut Vec<(String, String)>) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }
    let mut stmt = tx.prepare_cached(
        "INSERT INTO words(word, definition) VALUES (?1, ?2)
         ON CONFLICT(word) DO UPDATE SET definition=excluded.definition",
    )?;
    for (word, definition) in batch.drain(..) {
        stmt.execute(params![word, definition])?;
    }
    Ok(())
}

/// Removes a previous database file and its WAL sidecars, if present.
fn remove_stale(path: &Path) -> Result<()> {
    let mut targets = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut name = path.as_os_str().to_os_string();
        name.push(suffix);
        targets.push(PathBuf::from(name));
    }
    for target in targets {
        if target.exists() {
            fs::remove_file(&target)?;
        }
    }
    Ok(())
}
