//! Block framing and compression for the MDX container.
//!
//! Every key and record block on disk is an 8-byte frame followed by a zlib
//! stream: a little-endian compression-type marker, a big-endian Adler-32 of
//! the decompressed payload, then the compressed bytes. Index fields that
//! record a block's "compressed size" count the frame bytes as well.

use std::io::Write;

use adler2::adler32_slice;
use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use log::trace;

use crate::error::Result;

/// Zlib marker in the frame's compression-type field.
const COMPRESSION_ZLIB: u32 = 2;

/// Decompressed payload size at which a block is cut.
pub const BLOCK_SIZE: usize = 65536;

/// Compresses a payload into a framed on-disk block.
pub fn compress_block(payload: &[u8]) -> Result<Vec<u8>> {
    let mut frame = Vec::with_capacity(payload.len() / 2 + 16);
    frame.write_u32::<LittleEndian>(COMPRESSION_ZLIB)?;
    frame.extend_from_slice(&adler32_slice(payload).to_be_bytes());

    let mut encoder = ZlibEncoder::new(frame, Compression::default());
    encoder.write_all(payload)?;
    let framed = encoder.finish()?;

    trace!(
        "Compressed block: {} bytes -> {} bytes framed",
        payload.len(),
        framed.len()
    );
    Ok(framed)
}

/// Accumulates serialized items into block payloads cut at [`BLOCK_SIZE`].
///
/// A block closes when appending the next item would push it past the limit
/// and it already holds at least one item, so an oversized item still forms
/// a block of its own.
pub struct BlockAccumulator {
    payloads: Vec<Vec<u8>>,
    current: Vec<u8>,
}

impl BlockAccumulator {
    pub fn new() -> Self {
        Self {
            payloads: Vec::new(),
            current: Vec::new(),
        }
    }

    /// Appends one item's bytes, returning `true` when this item opened a
    /// fresh block.
    pub fn push(&mut self, item: &[u8]) -> bool {
        let mut opened = self.current.is_empty();
        if !opened && self.current.len() + item.len() > BLOCK_SIZE {
            self.payloads.push(std::mem::take(&mut self.current));
            opened = true;
        }
        self.current.extend_from_slice(item);
        opened
    }

    /// Closes the trailing block and returns all payloads in order.
    pub fn finish(mut self) -> Vec<Vec<u8>> {
        if !self.current.is_empty() {
            self.payloads.push(self.current);
        }
        self.payloads
    }
}

/// Index fields describing one finished key block.
#[derive(Debug, Default)]
pub struct KeyBlockMeta {
    pub num_entries: u64,
    /// First key's UTF-8 bytes, without the NUL terminator.
    pub first_key: Vec<u8>,
    /// Last key's UTF-8 bytes, without the NUL terminator.
    pub last_key: Vec<u8>,
}

/// Builds key block payloads together with their index metadata.
///
/// Each pushed entry is serialized as a big-endian record offset followed by
/// the NUL-terminated key text; blocks are cut by a [`BlockAccumulator`].
pub struct KeyBlockBuilder {
    acc: BlockAccumulator,
    metas: Vec<KeyBlockMeta>,
}

impl KeyBlockBuilder {
    pub fn new() -> Self {
        Self {
            acc: BlockAccumulator::new(),
            metas: Vec::new(),
        }
    }

    /// Appends one key entry pointing at `record_offset` in the virtual
    /// decompressed record stream.
    pub fn push(&mut self, key: &str, record_offset: u64) {
        let mut item = Vec::with_capacity(8 + key.len() + 1);
        item.extend_from_slice(&record_offset.to_be_bytes());
        item.extend_from_slice(key.as_bytes());
        item.push(0);

        if self.acc.push(&item) {
            self.metas.push(KeyBlockMeta {
                num_entries: 0,
                first_key: key.as_bytes().to_vec(),
                last_key: Vec::new(),
            });
        }
        // A meta exists for the open block as of the push above
        if let Some(meta) = self.metas.last_mut() {
            meta.num_entries += 1;
            meta.last_key = key.as_bytes().to_vec();
        }
    }

    /// Returns the block payloads and their metadata, in block order.
    pub fn finish(self) -> (Vec<Vec<u8>>, Vec<KeyBlockMeta>) {
        (self.acc.finish(), self.metas)
    }
}
