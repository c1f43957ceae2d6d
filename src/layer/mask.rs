//! Optional layer mask sub-record
//!
//! Two historically incompatible physical layouts exist, selected solely by
//! the declared block length: the 20-byte form stores rectangle, default
//! color, flags; the 36-byte legacy form stores flags, default color,
//! rectangle, followed by 18 bytes of parameter data this codec ignores.
//! The writer only ever emits the 20-byte form (read-compat,
//! write-canonical).

use crate::cursor::{ByteCursor, WriteCursor};
use crate::layer::Bounds;
use crate::{CodecError, CodecResult};

const FLAG_RELATIVE: u8 = 1 << 0;
const FLAG_DISABLED: u8 = 1 << 1;
const FLAG_INVERT: u8 = 1 << 2;

const SHORT_LAYOUT_LEN: u32 = 20;
const LONG_LAYOUT_LEN: u32 = 36;

/// Decoded layer mask metadata, identical for both physical layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerMaskBlock {
    pub bounds: Bounds,
    /// Fill color outside the mask's explicit area, 0 or 255
    pub default_color: u8,
    /// Mask position is relative to the layer, not the canvas
    pub relative_position: bool,
    /// Mask currently has no effect
    pub disabled: bool,
    /// Mask value is inverted when blending
    pub invert_blending: bool,
}

impl LayerMaskBlock {
    fn from_raw(bounds: Bounds, default_color: u8, flags: u8) -> Self {
        LayerMaskBlock {
            bounds,
            default_color,
            relative_position: flags & FLAG_RELATIVE != 0,
            disabled: flags & FLAG_DISABLED != 0,
            invert_blending: flags & FLAG_INVERT != 0,
        }
    }

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.relative_position {
            flags |= FLAG_RELATIVE;
        }
        if self.disabled {
            flags |= FLAG_DISABLED;
        }
        if self.invert_blending {
            flags |= FLAG_INVERT;
        }
        flags
    }
}

fn read_bounds<S: AsRef<[u8]>>(cursor: &mut ByteCursor<S>) -> CodecResult<Bounds> {
    Ok(Bounds {
        top: cursor.read_i32()?,
        left: cursor.read_i32()?,
        bottom: cursor.read_i32()?,
        right: cursor.read_i32()?,
    })
}

/// Read the mask block; a declared length of 0 means "no mask"
pub fn read_mask_block<S: AsRef<[u8]>>(
    cursor: &mut ByteCursor<S>,
) -> CodecResult<Option<LayerMaskBlock>> {
    let declared = cursor.read_u32()?;
    match declared {
        0 => Ok(None),

        SHORT_LAYOUT_LEN => {
            let bounds = read_bounds(cursor)?;
            let default_color = cursor.read_u8()?;
            let flags = cursor.read_u8()?;
            cursor.skip(2)?; // pad to declared length
            Ok(Some(LayerMaskBlock::from_raw(bounds, default_color, flags)))
        }

        LONG_LAYOUT_LEN => {
            // Legacy layout: flags and default color come before the
            // rectangle, and 18 parameter bytes trail the common fields
            let flags = cursor.read_u8()?;
            let default_color = cursor.read_u8()?;
            let bounds = read_bounds(cursor)?;
            cursor.skip(18)?;
            Ok(Some(LayerMaskBlock::from_raw(bounds, default_color, flags)))
        }

        other => Err(CodecError::InvalidMaskLength(other)),
    }
}

/// Write the mask block, always in the canonical 20-byte layout
pub fn write_mask_block(cursor: &mut WriteCursor, mask: Option<&LayerMaskBlock>) -> CodecResult<()> {
    let Some(mask) = mask else {
        return cursor.write_u32(0);
    };

    cursor.write_u32(SHORT_LAYOUT_LEN)?;
    cursor.write_i32(mask.bounds.top)?;
    cursor.write_i32(mask.bounds.left)?;
    cursor.write_i32(mask.bounds.bottom)?;
    cursor.write_i32(mask.bounds.right)?;
    cursor.write_u8(mask.default_color)?;
    cursor.write_u8(mask.flags())?;
    cursor.write_u16(0)?; // pad
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mask() -> LayerMaskBlock {
        LayerMaskBlock {
            bounds: Bounds {
                top: -4,
                left: 2,
                bottom: 60,
                right: 66,
            },
            default_color: 255,
            relative_position: true,
            disabled: false,
            invert_blending: true,
        }
    }

    fn short_layout_bytes(mask: &LayerMaskBlock) -> Vec<u8> {
        let mut cursor = WriteCursor::for_writing();
        write_mask_block(&mut cursor, Some(mask)).unwrap();
        cursor.into_bytes()
    }

    fn long_layout_bytes(mask: &LayerMaskBlock) -> Vec<u8> {
        let mut cursor = WriteCursor::for_writing();
        cursor.write_u32(LONG_LAYOUT_LEN).unwrap();
        cursor.write_u8(mask.flags()).unwrap();
        cursor.write_u8(mask.default_color).unwrap();
        cursor.write_i32(mask.bounds.top).unwrap();
        cursor.write_i32(mask.bounds.left).unwrap();
        cursor.write_i32(mask.bounds.bottom).unwrap();
        cursor.write_i32(mask.bounds.right).unwrap();
        cursor.write_bytes(&[0u8; 18]).unwrap();
        cursor.into_bytes()
    }

    #[test]
    fn test_absent_mask() {
        let mut cursor = ByteCursor::new(0u32.to_be_bytes());
        assert_eq!(read_mask_block(&mut cursor).unwrap(), None);
    }

    #[test]
    fn test_short_layout_roundtrip() {
        let mask = sample_mask();
        let bytes = short_layout_bytes(&mask);
        assert_eq!(bytes.len(), 24); // length field + 20-byte body

        let mut cursor = ByteCursor::new(bytes);
        assert_eq!(read_mask_block(&mut cursor).unwrap(), Some(mask));
    }

    #[test]
    fn test_both_layouts_decode_identically() {
        let mask = sample_mask();

        let mut short = ByteCursor::new(short_layout_bytes(&mask));
        let mut long = ByteCursor::new(long_layout_bytes(&mask));

        let from_short = read_mask_block(&mut short).unwrap();
        let from_long = read_mask_block(&mut long).unwrap();
        assert_eq!(from_short, from_long);
        assert_eq!(from_short, Some(mask));
    }

    #[test]
    fn test_invalid_declared_length() {
        let mut cursor = ByteCursor::new([0, 0, 0, 7, 1, 2, 3, 4, 5, 6, 7]);
        assert!(matches!(
            read_mask_block(&mut cursor),
            Err(CodecError::InvalidMaskLength(7))
        ));
    }

    #[test]
    fn test_flag_bits() {
        let mask = LayerMaskBlock::from_raw(Bounds::default(), 0, 0b0000_0111);
        assert!(mask.relative_position);
        assert!(mask.disabled);
        assert!(mask.invert_blending);
        assert_eq!(mask.flags(), 0b0000_0111);

        let mask = LayerMaskBlock::from_raw(Bounds::default(), 0, 0b0000_0010);
        assert!(!mask.relative_position);
        assert!(mask.disabled);
        assert!(!mask.invert_blending);
    }
}
