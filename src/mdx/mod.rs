//! MDict 2.0 (.mdx) package writer.
//!
//! Serializes a sorted set of `(key, HTML)` entries into the MDX container
//! format: an XML metadata header, a key section, and a record section.
//! Output is UTF-8 encoded, zlib compressed, and unencrypted.
//!
//! ```text
//! ┌───────────────────────┐
//! │ Header                │ ← header::build()
//! ├───────────────────────┤
//! │ Key preamble          │ ← five u64 fields + checksum
//! │ Key index (framed)    │ ← per-block entry counts, first/last keys
//! │ Key blocks (framed)   │ ← blocks::KeyBlockBuilder
//! ├───────────────────────┤
//! │ Record preamble       │ ← four u64 fields
//! │ Record index          │ ← (compressed, decompressed) size pairs
//! │ Record blocks (framed)│ ← blocks::BlockAccumulator
//! └───────────────────────┘
//! ```

mod blocks;
mod header;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use adler2::adler32_slice;
use byteorder::{BigEndian, WriteBytesExt};
use log::info;

use crate::error::{BuildError, Result};
use blocks::{BlockAccumulator, KeyBlockBuilder, compress_block};

/// A fully packaged MDX file, ready to stream out.
///
/// Construction does all the packing in memory; nothing touches the
/// filesystem until [`write_file`](MdxWriter::write_file), so an aborted
/// build leaves no output behind.
#[derive(Debug)]
pub struct MdxWriter {
    header: Vec<u8>,
    num_entries: u64,
    key_index_decomp_len: u64,
    key_index_framed: Vec<u8>,
    key_blocks: Vec<Vec<u8>>,
    record_index: Vec<(u64, u64)>,
    record_blocks: Vec<Vec<u8>>,
}

impl MdxWriter {
    /// Packages entries in the caller's (already sorted) order.
    ///
    /// Each entry's record offset is its cumulative position in the virtual
    /// decompressed record stream, so keys and records stay aligned and
    /// offsets strictly increase.
    pub fn new(entries: &[(String, String)], title: &str, description: &str) -> Result<Self> {
        if entries.is_empty() {
            return Err(BuildError::NoEntries);
        }

        let header = header::build(title, description)?;

        let mut records = BlockAccumulator::new();
        let mut keys = KeyBlockBuilder::new();
        let mut offset = 0u64;
        for (word, html) in entries {
            let mut item = Vec::with_capacity(html.len() + 1);
            item.extend_from_slice(html.as_bytes());
            item.push(0);
            records.push(&item);
            keys.push(word, offset);
            offset += item.len() as u64;
        }

        let (key_payloads, key_metas) = keys.finish();
        let mut key_blocks = Vec::with_capacity(key_payloads.len());
        let mut key_index = Vec::new();
        for (payload, meta) in key_payloads.iter().zip(&key_metas) {
            let framed = compress_block(payload)?;
            key_index.write_u64::<BigEndian>(meta.num_entries)?;
            write_index_key(&mut key_index, &meta.first_key)?;
            write_index_key(&mut key_index, &meta.last_key)?;
            key_index.write_u64::<BigEndian>(framed.len() as u64)?;
            key_index.write_u64::<BigEndian>(payload.len() as u64)?;
            key_blocks.push(framed);
        }
        let key_index_decomp_len = key_index.len() as u64;
        let key_index_framed = compress_block(&key_index)?;

        let record_payloads = records.finish();
        let mut record_blocks = Vec::with_capacity(record_payloads.len());
        let mut record_index = Vec::with_capacity(record_payloads.len());
        for payload in &record_payloads {
            let framed = compress_block(payload)?;
            record_index.push((framed.len() as u64, payload.len() as u64));
            record_blocks.push(framed);
        }

        info!(
            "Packed {} entries into {} key block(s) and {} record block(s)",
            entries.len(),
            key_blocks.len(),
            record_blocks.len()
        );

        Ok(Self {
            header,
            num_entries: entries.len() as u64,
            key_index_decomp_len,
            key_index_framed,
            key_blocks,
            record_index,
            record_blocks,
        })
    }

    /// Streams the complete file to `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.header)?;

        // Key preamble: five u64 fields checksummed as a unit
        let mut preamble = Vec::with_capacity(40);
        preamble.write_u64::<BigEndian>(self.key_blocks.len() as u64)?;
        preamble.write_u64::<BigEndian>(self.num_entries)?;
        preamble.write_u64::<BigEndian>(self.key_index_decomp_len)?;
        preamble.write_u64::<BigEndian>(self.key_index_framed.len() as u64)?;
        preamble.write_u64::<BigEndian>(self.section_len(&self.key_blocks))?;
        writer.write_all(&preamble)?;
        writer.write_u32::<BigEndian>(adler32_slice(&preamble))?;

        writer.write_all(&self.key_index_framed)?;
        for block in &self.key_blocks {
            writer.write_all(block)?;
        }

        // Record preamble carries no checksum
        writer.write_u64::<BigEndian>(self.record_blocks.len() as u64)?;
        writer.write_u64::<BigEndian>(self.num_entries)?;
        writer.write_u64::<BigEndian>(16 * self.record_blocks.len() as u64)?;
        writer.write_u64::<BigEndian>(self.section_len(&self.record_blocks))?;
        for (compressed, decompressed) in &self.record_index {
            writer.write_u64::<BigEndian>(*compressed)?;
            writer.write_u64::<BigEndian>(*decompressed)?;
        }
        for block in &self.record_blocks {
            writer.write_all(block)?;
        }

        Ok(())
    }

    /// Writes the file at `path`, creating parent directories as needed.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        info!("Wrote MDX package to {}", path.display());
        Ok(())
    }

    fn section_len(&self, blocks: &[Vec<u8>]) -> u64 {
        blocks.iter().map(|block| block.len() as u64).sum()
    }
}

/// Writes one length-prefixed, NUL-terminated key text into the key index.
///
/// The length prefix counts text units (bytes, for UTF-8) and excludes the
/// terminator.
fn write_index_key(index: &mut Vec<u8>, key: &[u8]) -> Result<()> {
    let units = u16::try_from(key.len()).map_err(|_| BuildError::OversizedWord(key.len()))?;
    index.write_u16::<BigEndian>(units)?;
    index.extend_from_slice(key);
    index.push(0);
    Ok(())
}
