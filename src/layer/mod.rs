//! Layer record: the metadata block describing one layer
//!
//! A record aggregates the bounding rectangle, channel table, blend mode,
//! opacity and flags, the optional mask block, the opaque blending-ranges
//! blob, the layer name, and the tagged info-block section. Reading is a
//! single forward pass; writing reserves every length field whose value
//! depends on variable-length children and backpatches it by seeking.

pub mod blocks;
pub mod channels;
pub mod mask;

use crate::container::{ColorMode, GlobalHeader, MAX_CHANNELS};
use crate::cursor::{ByteCursor, WriteCursor};
use crate::{CodecError, CodecResult};

use blocks::InfoBlockSection;
use channels::ChannelInfo;
use mask::LayerMaskBlock;

/// Signature preceding the blend-mode key in every record
pub const BLEND_SIGNATURE: &[u8; 4] = b"8BIM";

/// Blend-mode keys for the documented standard modes
pub mod blend {
    pub const NORMAL: [u8; 4] = *b"norm";
    pub const DISSOLVE: [u8; 4] = *b"diss";
    pub const DARKEN: [u8; 4] = *b"dark";
    pub const MULTIPLY: [u8; 4] = *b"mul ";
    pub const COLOR_BURN: [u8; 4] = *b"idiv";
    pub const LINEAR_BURN: [u8; 4] = *b"lbrn";
    pub const LIGHTEN: [u8; 4] = *b"lite";
    pub const SCREEN: [u8; 4] = *b"scrn";
    pub const COLOR_DODGE: [u8; 4] = *b"div ";
    pub const LINEAR_DODGE: [u8; 4] = *b"lddg";
    pub const OVERLAY: [u8; 4] = *b"over";
    pub const SOFT_LIGHT: [u8; 4] = *b"sLit";
    pub const HARD_LIGHT: [u8; 4] = *b"hLit";
    pub const VIVID_LIGHT: [u8; 4] = *b"vLit";
    pub const LINEAR_LIGHT: [u8; 4] = *b"lLit";
    pub const PIN_LIGHT: [u8; 4] = *b"pLit";
    pub const HARD_MIX: [u8; 4] = *b"hMix";
    pub const DIFFERENCE: [u8; 4] = *b"diff";
    pub const EXCLUSION: [u8; 4] = *b"smud";
    pub const SUBTRACT: [u8; 4] = *b"fsub";
    pub const DIVIDE: [u8; 4] = *b"fdiv";
    pub const HUE: [u8; 4] = *b"hue ";
    pub const SATURATION: [u8; 4] = *b"sat ";
    pub const COLOR: [u8; 4] = *b"colr";
    pub const LUMINOSITY: [u8; 4] = *b"lum ";
    pub const PASS_THROUGH: [u8; 4] = *b"pass";
}

const FLAG_TRANSPARENCY_PROTECTED: u8 = 1 << 0;
const FLAG_HIDDEN: u8 = 1 << 1;
const FLAG_BIT4_MEANINGFUL: u8 = 1 << 3;
const FLAG_IRRELEVANT: u8 = 1 << 4;

/// Rectangle in canvas coordinates; layers may extend off-canvas, so
/// coordinates are signed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl Bounds {
    pub fn width(&self) -> usize {
        (self.right - self.left).max(0) as usize
    }

    pub fn height(&self) -> usize {
        (self.bottom - self.top).max(0) as usize
    }

    /// top <= bottom and left <= right
    pub fn is_ordered(&self) -> bool {
        self.top <= self.bottom && self.left <= self.right
    }
}

/// Metadata for one layer
///
/// Pixel data is not owned here; it is read and written through
/// [`crate::pixels`] against the populated channel table.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRecord {
    pub bounds: Bounds,
    pub channels: Vec<ChannelInfo>,
    /// Opaque 4-byte blend-mode tag, see [`blend`]
    pub blend_mode: [u8; 4],
    /// 0 transparent .. 255 opaque
    pub opacity: u8,
    /// Layer clips to the layer below
    pub clipping: bool,
    /// Alpha is locked against painting
    pub transparency_protected: bool,
    pub visible: bool,
    /// Pixel data has no effect on the document's appearance
    pub irrelevant: bool,
    /// Layer name; a non-empty `luni` override supersedes the Pascal string
    pub name: String,
    pub mask: Option<LayerMaskBlock>,
    /// Opaque blending-ranges blob, passed through unchanged
    pub blending_ranges: Vec<u8>,
    pub info_blocks: InfoBlockSection,
}

impl Default for LayerRecord {
    fn default() -> Self {
        LayerRecord {
            bounds: Bounds::default(),
            channels: Vec::new(),
            blend_mode: blend::NORMAL,
            opacity: 255,
            clipping: false,
            transparency_protected: false,
            visible: true,
            irrelevant: false,
            name: String::new(),
            mask: None,
            blending_ranges: Vec::new(),
            info_blocks: InfoBlockSection::new(),
        }
    }
}

/// Stream positions of length fields still holding placeholders after
/// [`LayerRecord::write`]
#[derive(Debug, Clone)]
pub struct LayerPatches {
    /// One position per channel table entry, in table order
    pub channel_length_positions: Vec<u64>,
}

impl LayerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the channel-count bound against the header context
    pub fn validate(&self, header: &GlobalHeader) -> CodecResult<()> {
        check_channel_count(self.channels.len() as u16, header.color_mode)
    }

    /// True iff the bounding rectangle and channel-count invariants hold
    pub fn valid(&self, header: &GlobalHeader) -> bool {
        self.bounds.is_ordered() && self.validate(header).is_ok()
    }

    /// Parse one record from the cursor's current position
    pub fn read<S: AsRef<[u8]>>(
        cursor: &mut ByteCursor<S>,
        header: &GlobalHeader,
    ) -> CodecResult<Self> {
        let bounds = Bounds {
            top: cursor.read_i32()?,
            left: cursor.read_i32()?,
            bottom: cursor.read_i32()?,
            right: cursor.read_i32()?,
        };

        let channel_count = cursor.read_u16()?;
        check_channel_count(channel_count, header.color_mode)?;
        let channels = channels::read_channel_table(cursor, channel_count, header.version)?;

        let signature = cursor.read_4cc()?;
        if &signature != BLEND_SIGNATURE {
            return Err(CodecError::BadBlendSignature(signature));
        }
        let blend_mode = cursor.read_4cc()?;

        let opacity = cursor.read_u8()?;
        let clipping = cursor.read_u8()? != 0;
        let flags = cursor.read_u8()?;
        let filler = cursor.read_u8()?;
        if filler != 0 {
            return Err(CodecError::BadPadding(filler));
        }

        let extra_len = cursor.read_u32()? as u64;
        let extra_end = cursor.position() + extra_len;

        let mut record = LayerRecord {
            bounds,
            channels,
            blend_mode,
            opacity,
            clipping,
            transparency_protected: flags & FLAG_TRANSPARENCY_PROTECTED != 0,
            visible: flags & FLAG_HIDDEN == 0,
            irrelevant: flags & FLAG_BIT4_MEANINGFUL != 0 && flags & FLAG_IRRELEVANT != 0,
            ..LayerRecord::default()
        };

        if extra_len > 0 {
            record.mask = mask::read_mask_block(cursor)?;

            let ranges_len = cursor.read_u32()? as usize;
            record.blending_ranges = cursor.read_bytes(ranges_len)?;

            record.name = read_pascal_name(cursor)?;

            record.info_blocks = blocks::read_info_blocks(cursor, extra_end, header.version)?;
            if let Some(block) = record.info_blocks.take(blocks::UNICODE_NAME_KEY) {
                match blocks::decode_payload(block.key, &block.payload)? {
                    Some(blocks::DecodedPayload::UnicodeName(unicode)) if !unicode.is_empty() => {
                        record.name = unicode;
                    }
                    _ => {}
                }
            }

            // Land exactly at the end of the declared extra-data region;
            // trailing bytes the section did not claim belong to it
            cursor.seek(extra_end);
        }

        Ok(record)
    }

    /// Serialize the record, returning positions of the channel-length
    /// placeholders for the pixel packer to finalize
    pub fn write(
        &self,
        cursor: &mut WriteCursor,
        header: &GlobalHeader,
    ) -> CodecResult<LayerPatches> {
        cursor.write_i32(self.bounds.top)?;
        cursor.write_i32(self.bounds.left)?;
        cursor.write_i32(self.bounds.bottom)?;
        cursor.write_i32(self.bounds.right)?;

        cursor.write_u16(self.channels.len() as u16)?;
        let channel_length_positions =
            channels::write_channel_table(cursor, &self.channels, header.version)?;

        cursor.write_bytes(BLEND_SIGNATURE)?;
        cursor.write_bytes(&self.blend_mode)?;
        cursor.write_u8(self.opacity)?;
        cursor.write_u8(self.clipping as u8)?;
        cursor.write_u8(self.flags_byte())?;
        cursor.write_u8(0)?; // filler

        // Reserve the extra-data length; its value depends on everything
        // written below
        let extra_len_pos = cursor.position();
        cursor.write_u32(0)?;

        mask::write_mask_block(cursor, self.mask.as_ref())?;

        cursor.write_u32(self.blending_ranges.len() as u32)?;
        cursor.write_bytes(&self.blending_ranges)?;

        write_pascal_name(cursor, &self.name)?;

        blocks::write_info_blocks(cursor, &self.info_blocks, &self.name, header.version)?;

        let end = cursor.position();
        cursor.seek(extra_len_pos);
        cursor.write_u32((end - extra_len_pos - 4) as u32)?;
        cursor.seek(end);

        Ok(LayerPatches {
            channel_length_positions,
        })
    }

    fn flags_byte(&self) -> u8 {
        let mut flags = 0;
        if self.transparency_protected {
            flags |= FLAG_TRANSPARENCY_PROTECTED;
        }
        if !self.visible {
            flags |= FLAG_HIDDEN;
        }
        if self.irrelevant {
            flags |= FLAG_BIT4_MEANINGFUL | FLAG_IRRELEVANT;
        }
        flags
    }
}

/// Enforce the per-color-mode channel count bounds
pub fn check_channel_count(count: u16, mode: ColorMode) -> CodecResult<()> {
    let minimum = mode.minimum_channels();
    if count < minimum {
        return Err(CodecError::TooFewChannels {
            mode,
            minimum,
            found: count,
        });
    }
    if count > MAX_CHANNELS {
        return Err(CodecError::TooManyChannels { found: count });
    }
    Ok(())
}

/// Padded byte count following a Pascal name's length byte
pub(crate) fn padded_name_len(len: usize) -> usize {
    ((len + 1 + 3) & !3) - 1
}

fn read_pascal_name<S: AsRef<[u8]>>(cursor: &mut ByteCursor<S>) -> CodecResult<String> {
    let len = cursor.read_u8()? as usize;
    let raw = cursor.read_bytes(padded_name_len(len))?;
    Ok(String::from_utf8_lossy(&raw[..len]).into_owned())
}

fn write_pascal_name(cursor: &mut WriteCursor, name: &str) -> CodecResult<()> {
    let bytes = name.as_bytes();
    let len = bytes.len().min(255);
    cursor.write_u8(len as u8)?;
    cursor.write_bytes(&bytes[..len])?;
    for _ in len..padded_name_len(len) {
        cursor.write_u8(0)?;
    }
    Ok(())
}
