//! # PSD/PSB Layer Record Codec
//!
//! This library reads and writes the layer-record metadata block and the
//! compressed per-channel pixel data of a single layer inside a
//! Photoshop-style layered raster container (PSD format version 1, PSB
//! format version 2).
//!
//! The codec operates on an already-positioned byte stream plus a parsed
//! global header (color mode, bit depth, format version). Container
//! traversal lives in [`container`] and is only deep enough to hand the
//! codec a positioned stream; compositing, color management and anything
//! GUI-shaped is someone else's problem.

// Public API exports
pub mod cli;
pub mod container;
pub mod cursor;
pub mod layer;
pub mod pixels;
pub mod rle;

pub use container::{ColorMode, FormatVersion, GlobalHeader};
pub use cursor::{ByteCursor, WriteCursor};
pub use layer::{Bounds, LayerRecord};
pub use pixels::{ChannelPlane, PixelBuffer, Samples};

use layer::blocks::BlockKey;

/// Result type alias for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Comprehensive error type for the layer codec
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("stream truncated: needed {needed} bytes, {available} available")]
    TruncatedStream { needed: u64, available: u64 },

    #[error("info block '{key}' truncated: declared {declared} bytes, {available} available")]
    TruncatedBlock {
        key: BlockKey,
        declared: u64,
        available: u64,
    },

    #[error("bad file signature {0:?} (expected \"8BPS\")")]
    BadFileSignature([u8; 4]),

    #[error("unsupported container format version {0}")]
    UnsupportedVersion(u16),

    #[error("unknown color mode value {0} in global header")]
    UnknownColorMode(u16),

    #[error("bad blend signature {0:?} (expected \"8BIM\")")]
    BadBlendSignature([u8; 4]),

    #[error("nonzero filler byte {0:#04x} after layer flags")]
    BadPadding(u8),

    #[error("invalid mask block length {0} (expected 0, 20 or 36)")]
    InvalidMaskLength(u32),

    #[error("{mode:?} layers need at least {minimum} channels, record declares {found}")]
    TooFewChannels {
        mode: ColorMode,
        minimum: u16,
        found: u16,
    },

    #[error("record declares {found} channels, more than the format maximum of 56")]
    TooManyChannels { found: u16 },

    #[error("duplicate info block key '{0}'")]
    DuplicateBlockKey(BlockKey),

    #[error("unsupported channel compression mode {0}")]
    UnsupportedCompression(u16),

    #[error("unsupported color mode {0:?} for pixel assembly")]
    UnsupportedColorMode(ColorMode),

    #[error("unsupported channel depth {0}")]
    UnsupportedChannelDepth(u16),

    #[error("corrupt RLE row: {0}")]
    CorruptRle(String),

    #[error("write rejected by sink: {0}")]
    WriteFailed(std::io::Error),
}
