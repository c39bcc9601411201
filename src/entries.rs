//! Deduplicating accumulation of rendered entries.
//!
//! Records are processed in file-then-line order; inserting a word that is
//! already present overwrites the prior rendering and bumps a counter, so
//! the final map holds exactly one entry per distinct word, reflecting the
//! last occurrence. The map itself is unordered; the packaging step consumes
//! the explicitly sorted form only.

use std::collections::HashMap;
use std::path::PathBuf;

use log::{info, warn};

use crate::error::Result;
use crate::ndjson::RecordIter;
use crate::render;

/// Streams every shard record through the renderer, keyed by word.
///
/// Returns the word → HTML map and the number of overwritten duplicates.
pub fn load_entries(files: &[PathBuf]) -> Result<(HashMap<String, String>, u64)> {
    let mut entries: HashMap<String, String> = HashMap::new();
    let mut overwritten = 0u64;

    for record in RecordIter::new(files) {
        let record = record?;
        let html = render::render_entry(&record.word, &record.fields);
        if entries.insert(record.word, html).is_some() {
            overwritten += 1;
        }
    }

    info!("Loaded {} entries", entries.len());
    if overwritten > 0 {
        warn!("Overwrote {overwritten} duplicate word(s) with their later occurrences");
    }
    Ok((entries, overwritten))
}

/// Sorts accumulated entries for packaging: case-insensitive by word, with
/// the raw string as tie-break.
///
/// Words differing only in punctuation or whitespace fall through to the
/// same raw comparison.
pub fn sorted_entries(entries: HashMap<String, String>) -> Vec<(String, String)> {
    let mut items: Vec<(String, String)> = entries.into_iter().collect();
    items.sort_by_cached_key(|(word, _)| (word.to_lowercase(), word.clone()));
    items
}
