//! Minimal MDX parse-back support for the integration tests.
//!
//! Understands exactly what the packager emits: version 2.0, UTF-8 keys,
//! zlib-compressed unencrypted blocks. Every structural invariant is
//! asserted while parsing, so a test that gets entries back has also
//! verified the container layout.

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use adler2::adler32_slice;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;
use quick_xml::events::Event;

pub struct ParsedMdx {
    /// Attributes of the header's `Dictionary` element, unescaped.
    pub attributes: HashMap<String, String>,
    pub num_key_blocks: u64,
    pub num_record_blocks: u64,
    /// `(key, html)` pairs in file order.
    pub entries: Vec<(String, String)>,
}

pub fn parse_mdx(path: &Path) -> ParsedMdx {
    let data = fs::read(path).expect("read mdx file");
    let mut cursor = Cursor::new(data.as_slice());

    // Header: length-prefixed UTF-16LE XML plus a little-endian checksum
    let xml_len = cursor.read_u32::<BigEndian>().expect("header length") as usize;
    let xml_bytes = read_exact_vec(&mut cursor, xml_len);
    let checksum = cursor.read_u32::<LittleEndian>().expect("header checksum");
    assert_eq!(checksum, adler32_slice(&xml_bytes), "header checksum");
    let attributes = parse_attributes(&decode_utf16le(&xml_bytes));

    // Key preamble: five u64 fields checksummed as a unit
    let preamble_start = cursor.position() as usize;
    let num_key_blocks = cursor.read_u64::<BigEndian>().expect("num key blocks");
    let num_entries = cursor.read_u64::<BigEndian>().expect("num entries");
    let key_index_decomp_len = cursor.read_u64::<BigEndian>().expect("key index decomp len");
    let key_index_comp_len = cursor.read_u64::<BigEndian>().expect("key index comp len");
    let key_blocks_len = cursor.read_u64::<BigEndian>().expect("key blocks len");
    let preamble_end = cursor.position() as usize;
    let preamble_checksum = cursor.read_u32::<BigEndian>().expect("preamble checksum");
    assert_eq!(
        preamble_checksum,
        adler32_slice(&data[preamble_start..preamble_end]),
        "key preamble checksum"
    );

    // Key index: per-block entry counts, first/last keys, sizes
    let key_index = decode_frame(&read_exact_vec(&mut cursor, key_index_comp_len as usize));
    assert_eq!(
        key_index.len() as u64,
        key_index_decomp_len,
        "key index decompressed length"
    );
    let mut index = Cursor::new(key_index.as_slice());
    let mut block_metas = Vec::new();
    for _ in 0..num_key_blocks {
        let entries = index.read_u64::<BigEndian>().expect("block entry count");
        let first = read_index_key(&mut index);
        let last = read_index_key(&mut index);
        let comp = index.read_u64::<BigEndian>().expect("block compressed size");
        let decomp = index.read_u64::<BigEndian>().expect("block decompressed size");
        block_metas.push((entries, first, last, comp, decomp));
    }
    assert_eq!(
        index.position() as usize,
        key_index.len(),
        "key index fully consumed"
    );

    // Key blocks
    let mut keys: Vec<(u64, String)> = Vec::new();
    let mut consumed = 0u64;
    for (entries, first, last, comp, decomp) in &block_metas {
        let framed = read_exact_vec(&mut cursor, *comp as usize);
        let payload = decode_frame(&framed);
        assert_eq!(payload.len() as u64, *decomp, "key block decompressed size");
        let block_keys = parse_key_block(&payload);
        assert_eq!(block_keys.len() as u64, *entries, "block entry count");
        assert_eq!(&block_keys.first().expect("non-empty block").1, first, "first key");
        assert_eq!(&block_keys.last().expect("non-empty block").1, last, "last key");
        consumed += framed.len() as u64;
        keys.extend(block_keys);
    }
    assert_eq!(consumed, key_blocks_len, "key blocks length");
    assert_eq!(keys.len() as u64, num_entries, "total entry count");
    for window in keys.windows(2) {
        assert!(
            window[0].0 < window[1].0,
            "non-monotonic record offset at key {}",
            window[1].1
        );
    }

    // Record preamble and index
    let num_record_blocks = cursor.read_u64::<BigEndian>().expect("num record blocks");
    let record_entries = cursor.read_u64::<BigEndian>().expect("record entry count");
    assert_eq!(record_entries, num_entries, "record entry count");
    let index_len = cursor.read_u64::<BigEndian>().expect("record index length");
    assert_eq!(index_len, 16 * num_record_blocks, "record index length");
    let record_blocks_len = cursor.read_u64::<BigEndian>().expect("record blocks length");
    let mut record_index = Vec::new();
    for _ in 0..num_record_blocks {
        let comp = cursor.read_u64::<BigEndian>().expect("record compressed size");
        let decomp = cursor.read_u64::<BigEndian>().expect("record decompressed size");
        record_index.push((comp, decomp));
    }

    // Record blocks, concatenated into the virtual decompressed stream
    let mut record_stream = Vec::new();
    let mut consumed = 0u64;
    for (comp, decomp) in &record_index {
        let framed = read_exact_vec(&mut cursor, *comp as usize);
        let payload = decode_frame(&framed);
        assert_eq!(payload.len() as u64, *decomp, "record block decompressed size");
        consumed += framed.len() as u64;
        record_stream.extend_from_slice(&payload);
    }
    assert_eq!(consumed, record_blocks_len, "record blocks length");
    assert_eq!(cursor.position() as usize, data.len(), "file fully consumed");

    // Stitch keys to their NUL-terminated record slices
    let mut entries = Vec::with_capacity(keys.len());
    for (i, (offset, key)) in keys.iter().enumerate() {
        let end = keys
            .get(i + 1)
            .map(|(next, _)| *next as usize)
            .unwrap_or(record_stream.len());
        let slice = &record_stream[*offset as usize..end];
        let html = slice.strip_suffix(&[0]).expect("record terminator");
        entries.push((
            key.clone(),
            String::from_utf8(html.to_vec()).expect("utf-8 record"),
        ));
    }

    ParsedMdx {
        attributes,
        num_key_blocks,
        num_record_blocks,
        entries,
    }
}

/// Unframes one block: 4-byte compression tag, big-endian Adler-32 of the
/// decompressed payload, then the zlib stream.
fn decode_frame(framed: &[u8]) -> Vec<u8> {
    assert!(framed.len() > 8, "framed block too short");
    assert_eq!(&framed[0..4], &[0x02, 0x00, 0x00, 0x00], "compression tag");
    let checksum = u32::from_be_bytes([framed[4], framed[5], framed[6], framed[7]]);
    let mut payload = Vec::new();
    ZlibDecoder::new(&framed[8..])
        .read_to_end(&mut payload)
        .expect("zlib decompress");
    assert_eq!(checksum, adler32_slice(&payload), "block checksum");
    payload
}

fn parse_key_block(mut payload: &[u8]) -> Vec<(u64, String)> {
    let mut entries = Vec::new();
    while !payload.is_empty() {
        let offset = payload.read_u64::<BigEndian>().expect("record offset");
        let nul = payload.iter().position(|&b| b == 0).expect("key terminator");
        let key = String::from_utf8(payload[..nul].to_vec()).expect("utf-8 key");
        payload = &payload[nul + 1..];
        entries.push((offset, key));
    }
    entries
}

fn read_index_key(cursor: &mut Cursor<&[u8]>) -> String {
    let len = cursor.read_u16::<BigEndian>().expect("key length") as usize;
    let bytes = read_exact_vec(cursor, len);
    assert_eq!(cursor.read_u8().expect("key terminator"), 0, "key terminator");
    String::from_utf8(bytes).expect("utf-8 key")
}

fn read_exact_vec(cursor: &mut Cursor<&[u8]>, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    cursor.read_exact(&mut buf).expect("read block");
    buf
}

fn decode_utf16le(bytes: &[u8]) -> String {
    assert_eq!(bytes.len() % 2, 0, "utf-16 byte length");
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16(&units).expect("utf-16 header")
}

fn parse_attributes(xml: &str) -> HashMap<String, String> {
    let mut reader = quick_xml::Reader::from_str(xml.trim_end_matches(['\0', '\r', '\n']));
    loop {
        match reader.read_event().expect("header xml") {
            Event::Empty(element) => {
                assert_eq!(element.name().as_ref(), b"Dictionary", "header element");
                let mut attributes = HashMap::new();
                for attr in element.attributes() {
                    let attr = attr.expect("header attribute");
                    let key = String::from_utf8(attr.key.as_ref().to_vec()).expect("attribute name");
                    let value = attr.unescape_value().expect("attribute value").into_owned();
                    attributes.insert(key, value);
                }
                return attributes;
            }
            Event::Eof => panic!("missing Dictionary element in header"),
            _ => {}
        }
    }
}
