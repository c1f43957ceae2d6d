//! Tagged, length-prefixed info blocks attached to a layer record
//!
//! Each block is `8BIM` signature + 4-byte key + declared size + payload.
//! The section preserves insertion order and rejects duplicate keys.
//! Payloads are opaque except where a decoder is registered; the one
//! registered decoder handles the `luni` UTF-16 name override.

use std::fmt;

use crate::container::FormatVersion;
use crate::cursor::{ByteCursor, WriteCursor};
use crate::{CodecError, CodecResult};

/// Signature prefixing every info block
pub const BLOCK_SIGNATURE: &[u8; 4] = b"8BIM";

/// Key of the UTF-16 layer-name override block
pub const UNICODE_NAME_KEY: BlockKey = BlockKey(*b"luni");

/// Keys whose declared size is 64-bit in format version 2
pub const LONG_LENGTH_KEYS: [BlockKey; 13] = [
    BlockKey(*b"LMsk"),
    BlockKey(*b"Lr16"),
    BlockKey(*b"Lr32"),
    BlockKey(*b"Layr"),
    BlockKey(*b"Mt16"),
    BlockKey(*b"Mt32"),
    BlockKey(*b"Mtrn"),
    BlockKey(*b"Alph"),
    BlockKey(*b"FMsk"),
    BlockKey(*b"lnk2"),
    BlockKey(*b"FEid"),
    BlockKey(*b"FXid"),
    BlockKey(*b"PxSD"),
];

/// 4-byte info block key
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockKey(pub [u8; 4]);

impl BlockKey {
    /// True when format version 2 stores this key's size as 64-bit
    pub fn has_long_length(self, version: FormatVersion) -> bool {
        version == FormatVersion::Two && LONG_LENGTH_KEYS.contains(&self)
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockKey({})", self)
    }
}

/// One tagged sub-record: key plus raw payload bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoBlock {
    pub key: BlockKey,
    pub payload: Vec<u8>,
}

/// Ordered, duplicate-free collection of a layer's info blocks
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InfoBlockSection {
    blocks: Vec<InfoBlock>,
}

impl InfoBlockSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block, rejecting keys already present
    pub fn insert(&mut self, block: InfoBlock) -> CodecResult<()> {
        if self.contains(block.key) {
            return Err(CodecError::DuplicateBlockKey(block.key));
        }
        self.blocks.push(block);
        Ok(())
    }

    pub fn contains(&self, key: BlockKey) -> bool {
        self.blocks.iter().any(|b| b.key == key)
    }

    pub fn get(&self, key: BlockKey) -> Option<&InfoBlock> {
        self.blocks.iter().find(|b| b.key == key)
    }

    /// Remove and return the block with `key`, preserving the order of the
    /// remaining blocks
    pub fn take(&mut self, key: BlockKey) -> Option<InfoBlock> {
        let index = self.blocks.iter().position(|b| b.key == key)?;
        Some(self.blocks.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &InfoBlock> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Payloads the codec knows how to interpret
///
/// Unknown keys fall through as opaque passthrough; this registry is the
/// only place a new key decoder needs to be added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedPayload {
    UnicodeName(String),
}

/// Decode `payload` if a decoder is registered for `key`
pub fn decode_payload(key: BlockKey, payload: &[u8]) -> CodecResult<Option<DecodedPayload>> {
    match key {
        UNICODE_NAME_KEY => Ok(Some(DecodedPayload::UnicodeName(decode_unicode_name(
            payload,
        )?))),
        _ => Ok(None),
    }
}

/// Decode a `luni` payload: 32-bit code-unit count, then UTF-16BE units
pub fn decode_unicode_name(payload: &[u8]) -> CodecResult<String> {
    let mut cursor = ByteCursor::new(payload);
    let count = cursor.read_u32()? as usize;
    let mut units = Vec::with_capacity(count);
    for _ in 0..count {
        units.push(cursor.read_u16()?);
    }
    let name = String::from_utf16_lossy(&units);
    Ok(name.trim_end_matches('\0').to_string())
}

/// Build a `luni` payload from the current layer name
pub fn encode_unicode_name(name: &str) -> Vec<u8> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let mut payload = Vec::with_capacity(4 + units.len() * 2);
    payload.extend_from_slice(&(units.len() as u32).to_be_bytes());
    for unit in units {
        payload.extend_from_slice(&unit.to_be_bytes());
    }
    payload
}

/// Read info blocks until the region ends or a non-block signature appears
///
/// `region_end` bounds the section; bytes past the first non-matching
/// signature belong to the caller and are left unconsumed.
pub fn read_info_blocks<S: AsRef<[u8]>>(
    cursor: &mut ByteCursor<S>,
    region_end: u64,
    version: FormatVersion,
) -> CodecResult<InfoBlockSection> {
    let mut section = InfoBlockSection::new();

    while region_end.saturating_sub(cursor.position()) >= 4 {
        if &cursor.peek_4cc()? != BLOCK_SIGNATURE {
            break;
        }
        cursor.skip(4)?;

        let key = BlockKey(cursor.read_4cc()?);
        let declared = if key.has_long_length(version) {
            cursor.read_u64()?
        } else {
            cursor.read_u32()? as u64
        };

        let available = region_end
            .saturating_sub(cursor.position())
            .min(cursor.bytes_remaining());
        if declared > available {
            return Err(CodecError::TruncatedBlock {
                key,
                declared,
                available,
            });
        }

        let payload = cursor.read_bytes(declared as usize)?;
        section.insert(InfoBlock { key, payload })?;
    }

    Ok(section)
}

/// Write the section in insertion order
///
/// The `luni` payload is always re-derived from `name`; a stale cached
/// payload is never trusted. When `name` is non-empty and no `luni` block
/// is stored, one is appended after the stored blocks.
pub fn write_info_blocks(
    cursor: &mut WriteCursor,
    section: &InfoBlockSection,
    name: &str,
    version: FormatVersion,
) -> CodecResult<()> {
    let mut wrote_name = false;

    for block in section.iter() {
        if block.key == UNICODE_NAME_KEY {
            write_block(cursor, block.key, &encode_unicode_name(name), version)?;
            wrote_name = true;
        } else {
            write_block(cursor, block.key, &block.payload, version)?;
        }
    }

    if !wrote_name && !name.is_empty() {
        write_block(cursor, UNICODE_NAME_KEY, &encode_unicode_name(name), version)?;
    }

    Ok(())
}

fn write_block(
    cursor: &mut WriteCursor,
    key: BlockKey,
    payload: &[u8],
    version: FormatVersion,
) -> CodecResult<()> {
    cursor.write_bytes(BLOCK_SIGNATURE)?;
    cursor.write_bytes(&key.0)?;
    if key.has_long_length(version) {
        cursor.write_u64(payload.len() as u64)?;
    } else {
        cursor.write_u32(payload.len() as u32)?;
    }
    cursor.write_bytes(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_bytes(key: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(BLOCK_SIGNATURE);
        bytes.extend_from_slice(key);
        bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_read_stops_at_foreign_signature() {
        let mut bytes = block_bytes(b"lsct", &4u32.to_be_bytes());
        bytes.extend_from_slice(b"XXXXtrailing");

        let end = bytes.len() as u64;
        let mut cursor = ByteCursor::new(bytes);
        let section = read_info_blocks(&mut cursor, end, FormatVersion::One).unwrap();

        assert_eq!(section.len(), 1);
        assert!(section.contains(BlockKey(*b"lsct")));
        assert_eq!(cursor.position(), 16); // trailing bytes untouched
    }

    #[test]
    fn test_read_respects_region_end() {
        let mut bytes = block_bytes(b"lsct", &[0u8; 4]);
        let end = bytes.len() as u64;
        // A second block lies past the declared region and must be ignored
        bytes.extend_from_slice(&block_bytes(b"lyid", &[0u8; 4]));

        let mut cursor = ByteCursor::new(bytes);
        let section = read_info_blocks(&mut cursor, end, FormatVersion::One).unwrap();
        assert_eq!(section.len(), 1);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut bytes = block_bytes(b"luni", &encode_unicode_name("first"));
        bytes.extend_from_slice(&block_bytes(b"luni", &encode_unicode_name("second")));

        let end = bytes.len() as u64;
        let mut cursor = ByteCursor::new(bytes);
        let result = read_info_blocks(&mut cursor, end, FormatVersion::One);
        assert!(matches!(
            result,
            Err(CodecError::DuplicateBlockKey(UNICODE_NAME_KEY))
        ));
    }

    #[test]
    fn test_truncated_block() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(BLOCK_SIGNATURE);
        bytes.extend_from_slice(b"lsct");
        bytes.extend_from_slice(&100u32.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 4]); // far fewer than declared

        let end = bytes.len() as u64;
        let mut cursor = ByteCursor::new(bytes);
        assert!(matches!(
            read_info_blocks(&mut cursor, end, FormatVersion::One),
            Err(CodecError::TruncatedBlock { declared: 100, .. })
        ));
    }

    #[test]
    fn test_unicode_name_roundtrip() {
        let payload = encode_unicode_name("Layer \u{00e9}\u{4e2d}");
        assert_eq!(
            decode_unicode_name(&payload).unwrap(),
            "Layer \u{00e9}\u{4e2d}"
        );
    }

    #[test]
    fn test_decode_payload_registry() {
        let decoded = decode_payload(UNICODE_NAME_KEY, &encode_unicode_name("x")).unwrap();
        assert_eq!(decoded, Some(DecodedPayload::UnicodeName("x".to_string())));

        let opaque = decode_payload(BlockKey(*b"lsct"), &[1, 2, 3]).unwrap();
        assert_eq!(opaque, None);
    }

    #[test]
    fn test_long_length_keys_in_version_two() {
        let key = BlockKey(*b"Lr16");
        assert!(key.has_long_length(FormatVersion::Two));
        assert!(!key.has_long_length(FormatVersion::One));
        assert!(!UNICODE_NAME_KEY.has_long_length(FormatVersion::Two));

        // 64-bit size field roundtrip
        let mut writer = WriteCursor::for_writing();
        write_block(&mut writer, key, &[0xAB; 3], FormatVersion::Two).unwrap();
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 4 + 4 + 8 + 3);

        let end = bytes.len() as u64;
        let mut cursor = ByteCursor::new(bytes);
        let section = read_info_blocks(&mut cursor, end, FormatVersion::Two).unwrap();
        assert_eq!(section.get(key).unwrap().payload, vec![0xAB; 3]);
    }

    #[test]
    fn test_write_rederives_name_payload() {
        let mut section = InfoBlockSection::new();
        // Stale cached payload claims a different name
        section
            .insert(InfoBlock {
                key: UNICODE_NAME_KEY,
                payload: encode_unicode_name("stale"),
            })
            .unwrap();

        let mut writer = WriteCursor::for_writing();
        write_info_blocks(&mut writer, &section, "fresh", FormatVersion::One).unwrap();

        let bytes = writer.into_bytes();
        let end = bytes.len() as u64;
        let mut cursor = ByteCursor::new(bytes);
        let reread = read_info_blocks(&mut cursor, end, FormatVersion::One).unwrap();
        let payload = &reread.get(UNICODE_NAME_KEY).unwrap().payload;
        assert_eq!(decode_unicode_name(payload).unwrap(), "fresh");
    }

    #[test]
    fn test_write_appends_name_block_when_missing() {
        let section = InfoBlockSection::new();
        let mut writer = WriteCursor::for_writing();
        write_info_blocks(&mut writer, &section, "named", FormatVersion::One).unwrap();

        let bytes = writer.into_bytes();
        let end = bytes.len() as u64;
        let mut cursor = ByteCursor::new(bytes);
        let reread = read_info_blocks(&mut cursor, end, FormatVersion::One).unwrap();
        assert!(reread.contains(UNICODE_NAME_KEY));

        // Empty name produces no block at all
        let mut writer = WriteCursor::for_writing();
        write_info_blocks(&mut writer, &section, "", FormatVersion::One).unwrap();
        assert!(writer.into_bytes().is_empty());
    }
}
