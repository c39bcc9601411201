//! MDX header assembly.
//!
//! The header is a UTF-16LE encoded XML element preceded by a big-endian
//! length prefix and followed by a little-endian Adler-32 of the encoded
//! bytes. Readers detect a 2.0 header by the trailing double-NUL that the
//! final `\0` code unit encodes to.

use adler2::adler32_slice;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use chrono::Utc;
use log::debug;
use quick_xml::escape::escape;

use crate::error::Result;

/// Builds the complete header section for an unencrypted UTF-8 2.0 file.
///
/// `title` and `description` are embedded as XML attribute values and
/// escaped accordingly.
pub fn build(title: &str, description: &str) -> Result<Vec<u8>> {
    let xml = format!(
        "<Dictionary GeneratedByEngineVersion=\"2.0\" RequiredEngineVersion=\"2.0\" \
         Encrypted=\"0\" Encoding=\"UTF-8\" Format=\"Html\" CreationDate=\"{date}\" \
         Compact=\"No\" Compat=\"No\" KeyCaseSensitive=\"No\" Description=\"{description}\" \
         Title=\"{title}\" DataSourceFormat=\"106\" StyleSheet=\"\"/>\r\n\0",
        date = Utc::now().format("%Y-%m-%d"),
        description = escape(description),
        title = escape(title),
    );

    let mut xml_bytes = Vec::with_capacity(xml.len() * 2);
    for unit in xml.encode_utf16() {
        xml_bytes.extend_from_slice(&unit.to_le_bytes());
    }

    let mut header = Vec::with_capacity(xml_bytes.len() + 8);
    header.write_u32::<BigEndian>(xml_bytes.len() as u32)?;
    header.extend_from_slice(&xml_bytes);
    header.write_u32::<LittleEndian>(adler32_slice(&xml_bytes))?;

    debug!("Built MDX header: {} bytes of UTF-16LE XML", xml_bytes.len());
    Ok(header)
}
