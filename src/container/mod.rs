//! Container boundary: global header and positioning for layer records
//!
//! The layer codec itself never walks the surrounding file. This module
//! carries the parsed global context every codec call needs (format
//! version, color mode, channel depth) and just enough traversal to leave a
//! cursor at the first layer record for callers like the CLI.

use crate::cursor::ByteCursor;
use crate::{CodecError, CodecResult};

/// Container file signature
pub const FILE_SIGNATURE: &[u8; 4] = b"8BPS";

/// Hard format limit on channels per layer
pub const MAX_CHANNELS: u16 = 56;

/// Container format version; selects the width of several length fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    /// Classic PSD: 32-bit section and channel lengths
    One,
    /// Large-document PSB: 64-bit section and channel lengths
    Two,
}

impl FormatVersion {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FormatVersion::One),
            2 => Some(FormatVersion::Two),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            FormatVersion::One => 1,
            FormatVersion::Two => 2,
        }
    }
}

/// Document color mode as stored in the global header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Bitmap,
    Grayscale,
    Indexed,
    Rgb,
    Cmyk,
    Multichannel,
    Duotone,
    Lab,
}

impl ColorMode {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(ColorMode::Bitmap),
            1 => Some(ColorMode::Grayscale),
            2 => Some(ColorMode::Indexed),
            3 => Some(ColorMode::Rgb),
            4 => Some(ColorMode::Cmyk),
            7 => Some(ColorMode::Multichannel),
            8 => Some(ColorMode::Duotone),
            9 => Some(ColorMode::Lab),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            ColorMode::Bitmap => 0,
            ColorMode::Grayscale => 1,
            ColorMode::Indexed => 2,
            ColorMode::Rgb => 3,
            ColorMode::Cmyk => 4,
            ColorMode::Multichannel => 7,
            ColorMode::Duotone => 8,
            ColorMode::Lab => 9,
        }
    }

    /// Fewest channels a layer record may declare in this mode
    pub fn minimum_channels(self) -> u16 {
        match self {
            ColorMode::Rgb | ColorMode::Cmyk | ColorMode::Lab => 3,
            _ => 1,
        }
    }
}

/// Parsed global header; the context every layer-record operation is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalHeader {
    pub version: FormatVersion,
    pub channel_count: u16,
    pub height: u32,
    pub width: u32,
    pub depth: u16,
    pub color_mode: ColorMode,
}

impl GlobalHeader {
    /// Parse the fixed 26-byte file header
    pub fn read<S: AsRef<[u8]>>(cursor: &mut ByteCursor<S>) -> CodecResult<Self> {
        let signature = cursor.read_4cc()?;
        if &signature != FILE_SIGNATURE {
            return Err(CodecError::BadFileSignature(signature));
        }

        let raw_version = cursor.read_u16()?;
        let version = FormatVersion::from_u16(raw_version)
            .ok_or(CodecError::UnsupportedVersion(raw_version))?;

        cursor.skip(6)?; // reserved

        let channel_count = cursor.read_u16()?;
        let height = cursor.read_u32()?;
        let width = cursor.read_u32()?;
        let depth = cursor.read_u16()?;

        let raw_mode = cursor.read_u16()?;
        let color_mode =
            ColorMode::from_u16(raw_mode).ok_or(CodecError::UnknownColorMode(raw_mode))?;

        Ok(GlobalHeader {
            version,
            channel_count,
            height,
            width,
            depth,
            color_mode,
        })
    }

    /// Width in bytes of version-dependent section length fields
    pub fn read_section_length<S: AsRef<[u8]>>(
        &self,
        cursor: &mut ByteCursor<S>,
    ) -> CodecResult<u64> {
        match self.version {
            FormatVersion::One => Ok(cursor.read_u32()? as u64),
            FormatVersion::Two => cursor.read_u64(),
        }
    }
}

/// Position and shape of the layer-record sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSection {
    pub layer_count: u16,
    /// Negative stored count: the first alpha channel of the merged result
    /// holds the transparency data
    pub merged_alpha: bool,
}

/// Skip from just after the global header to the first layer record
///
/// Leaves the cursor positioned at the start of the first record; the
/// caller owns iteration from there.
pub fn seek_layer_records<S: AsRef<[u8]>>(
    cursor: &mut ByteCursor<S>,
    header: &GlobalHeader,
) -> CodecResult<LayerSection> {
    let color_data_len = cursor.read_u32()? as u64;
    cursor.skip(color_data_len)?;

    let resources_len = cursor.read_u32()? as u64;
    cursor.skip(resources_len)?;

    // Layer-and-mask section wraps the layer-info subsection
    let _section_len = header.read_section_length(cursor)?;
    let info_len = header.read_section_length(cursor)?;
    if info_len == 0 {
        return Ok(LayerSection {
            layer_count: 0,
            merged_alpha: false,
        });
    }

    let stored_count = cursor.read_i16()?;
    Ok(LayerSection {
        layer_count: stored_count.unsigned_abs(),
        merged_alpha: stored_count < 0,
    })
}
