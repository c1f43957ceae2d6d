//! Per-layer channel table: id plus compressed byte length per channel
//!
//! Length fields are 32-bit in format version 1 and 64-bit in version 2.
//! The writer supports the reserve-then-backpatch protocol: it reports the
//! stream position of every length field so the pixel packer can finalize
//! them once real compressed sizes exist.

use crate::container::FormatVersion;
use crate::cursor::{ByteCursor, WriteCursor};
use crate::CodecResult;

/// Transparency (alpha) plane
pub const TRANSPARENCY_CHANNEL: i16 = -1;
/// Layer mask plane
pub const USER_MASK_CHANNEL: i16 = -2;
/// "Real" user mask plane, present when a vector and a raster mask coexist
pub const REAL_USER_MASK_CHANNEL: i16 = -3;

/// One channel table entry
///
/// Negative ids are alpha/mask planes; ids >= 0 are color planes in
/// color-space order. The byte offset of a channel's data region is not
/// stored: regions follow the metadata block sequentially in table order,
/// so offsets are derived by summing the lengths of preceding entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: i16,
    pub length: u64,
}

/// Read `count` channel entries in table order
pub fn read_channel_table<S: AsRef<[u8]>>(
    cursor: &mut ByteCursor<S>,
    count: u16,
    version: FormatVersion,
) -> CodecResult<Vec<ChannelInfo>> {
    let mut channels = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let id = cursor.read_i16()?;
        let length = match version {
            FormatVersion::One => cursor.read_u32()? as u64,
            FormatVersion::Two => cursor.read_u64()?,
        };
        channels.push(ChannelInfo { id, length });
    }
    Ok(channels)
}

/// Write the channel table, returning the position of each length field
///
/// Entries whose final compressed size is not yet known carry a 0 length;
/// the caller patches them through [`patch_channel_lengths`] afterwards.
pub fn write_channel_table(
    cursor: &mut WriteCursor,
    channels: &[ChannelInfo],
    version: FormatVersion,
) -> CodecResult<Vec<u64>> {
    let mut length_positions = Vec::with_capacity(channels.len());
    for channel in channels {
        cursor.write_i16(channel.id)?;
        length_positions.push(cursor.position());
        match version {
            FormatVersion::One => cursor.write_u32(channel.length as u32)?,
            FormatVersion::Two => cursor.write_u64(channel.length)?,
        }
    }
    Ok(length_positions)
}

/// Backpatch previously written channel lengths once real sizes are known
pub fn patch_channel_lengths(
    cursor: &mut WriteCursor,
    positions: &[u64],
    lengths: &[u64],
    version: FormatVersion,
) -> CodecResult<()> {
    let end = cursor.position();
    for (&position, &length) in positions.iter().zip(lengths) {
        cursor.seek(position);
        match version {
            FormatVersion::One => cursor.write_u32(length as u32)?,
            FormatVersion::Two => cursor.write_u64(length)?,
        }
    }
    cursor.seek(end);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANNELS: [ChannelInfo; 4] = [
        ChannelInfo {
            id: TRANSPARENCY_CHANNEL,
            length: 10,
        },
        ChannelInfo { id: 0, length: 20 },
        ChannelInfo { id: 1, length: 30 },
        ChannelInfo { id: 2, length: 40 },
    ];

    #[test]
    fn test_roundtrip_version_one() {
        let mut writer = WriteCursor::for_writing();
        write_channel_table(&mut writer, &CHANNELS, FormatVersion::One).unwrap();
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 4 * 6);

        let mut reader = ByteCursor::new(bytes);
        let channels = read_channel_table(&mut reader, 4, FormatVersion::One).unwrap();
        assert_eq!(channels, CHANNELS);
    }

    #[test]
    fn test_roundtrip_version_two_widths() {
        let mut writer = WriteCursor::for_writing();
        write_channel_table(&mut writer, &CHANNELS, FormatVersion::Two).unwrap();
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 4 * 10);

        let mut reader = ByteCursor::new(bytes);
        let channels = read_channel_table(&mut reader, 4, FormatVersion::Two).unwrap();
        assert_eq!(channels, CHANNELS);
    }

    #[test]
    fn test_backpatch_placeholders() {
        let placeholders: Vec<ChannelInfo> = CHANNELS
            .iter()
            .map(|c| ChannelInfo {
                id: c.id,
                length: 0,
            })
            .collect();

        let mut writer = WriteCursor::for_writing();
        let positions =
            write_channel_table(&mut writer, &placeholders, FormatVersion::One).unwrap();
        writer.write_bytes(b"trailing").unwrap();
        let end = writer.position();

        patch_channel_lengths(&mut writer, &positions, &[10, 20, 30, 40], FormatVersion::One)
            .unwrap();
        assert_eq!(writer.position(), end);

        let mut reader = ByteCursor::new(writer.into_bytes());
        let channels = read_channel_table(&mut reader, 4, FormatVersion::One).unwrap();
        assert_eq!(channels, CHANNELS);
    }
}
