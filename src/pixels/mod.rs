//! Channel pixel assembly: planar channel regions to interleaved pixels
//!
//! Decoding walks one layer's channel regions (laid out sequentially after
//! the metadata block, in channel-table order), decompresses each row, and
//! interleaves the planes into one pixel buffer. Encoding is the inverse:
//! planar samples are complemented/byte-swapped as the color layout
//! demands, RLE-compressed row by row, and each channel's per-row length
//! table is reserved up front and backpatched once the real sizes exist.
//!
//! Only RGB, CMYK and Lab documents are assembled here; CMYK samples are
//! stored complemented in the container. Zip-style compression modes are
//! recognized and rejected as unsupported.

use crate::container::{ColorMode, GlobalHeader};
use crate::cursor::{ByteCursor, WriteCursor};
use crate::layer::channels::{ChannelInfo, TRANSPARENCY_CHANNEL};
use crate::layer::Bounds;
use crate::rle;
use crate::{CodecError, CodecResult};

/// Channel data stored raw, one row after another
pub const COMPRESSION_RAW: u16 = 0;
/// PackBits rows behind a per-row length table
pub const COMPRESSION_RLE: u16 = 1;

/// Channel layout resolved once from the global header
///
/// A closed variant set instead of per-pixel mode dispatch: each variant
/// fixes the color plane count and the sample inversion rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorLayout {
    Rgb,
    Cmyk,
    Lab,
}

impl ColorLayout {
    pub fn for_header(header: &GlobalHeader) -> CodecResult<Self> {
        match header.color_mode {
            ColorMode::Rgb => Ok(ColorLayout::Rgb),
            ColorMode::Cmyk => Ok(ColorLayout::Cmyk),
            ColorMode::Lab => Ok(ColorLayout::Lab),
            mode => Err(CodecError::UnsupportedColorMode(mode)),
        }
    }

    /// Color planes, excluding alpha
    pub fn color_planes(self) -> usize {
        match self {
            ColorLayout::Rgb | ColorLayout::Lab => 3,
            ColorLayout::Cmyk => 4,
        }
    }

    /// Color samples are stored complemented in the container
    pub fn stores_inverted(self) -> bool {
        matches!(self, ColorLayout::Cmyk)
    }
}

fn bytes_per_sample(depth: u16) -> CodecResult<usize> {
    match depth {
        8 => Ok(1),
        16 => Ok(2),
        other => Err(CodecError::UnsupportedChannelDepth(other)),
    }
}

/// Sample storage at the document's channel depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Samples {
    Eight(Vec<u8>),
    Sixteen(Vec<u16>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::Eight(v) => v.len(),
            Samples::Sixteen(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interleaved pixel buffer: color planes in id order, alpha last
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    pub components: usize,
    pub samples: Samples,
}

/// One planar channel handed to the packer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPlane {
    pub id: i16,
    pub samples: Samples,
}

/// Decode one layer's channel regions into an interleaved pixel buffer
///
/// The cursor must sit at the start of the layer's pixel-data region and
/// `channels` must be the fully resolved channel table (no placeholder
/// lengths). On return the cursor sits past the whole region. Mask planes
/// (ids below -1) cover the mask rectangle rather than the layer rectangle
/// and are skipped, not assembled.
pub fn unpack<S: AsRef<[u8]>>(
    cursor: &mut ByteCursor<S>,
    channels: &[ChannelInfo],
    bounds: &Bounds,
    header: &GlobalHeader,
) -> CodecResult<PixelBuffer> {
    let layout = ColorLayout::for_header(header)?;
    let sample_bytes = bytes_per_sample(header.depth)?;
    let width = bounds.width();
    let height = bounds.height();
    let row_bytes = width * sample_bytes;
    let components = layout.color_planes() + 1;

    // Planar pass: each channel region decodes independently through its
    // own row state, keyed off offsets derived from the channel table
    let mut planes: Vec<(i16, Vec<u8>)> = Vec::with_capacity(channels.len());
    let mut offset = cursor.position();
    for info in channels {
        let next = offset + info.length;
        let assembled = info.id >= 0 || info.id == TRANSPARENCY_CHANNEL;
        if assembled && info.length > 0 && width > 0 && height > 0 {
            cursor.seek(offset);
            planes.push((info.id, decode_channel(cursor, row_bytes, height)?));
        }
        offset = next;
    }
    cursor.seek(offset);

    let pixel_count = width * height;
    let samples = match header.depth {
        8 => {
            let mut out = vec![0u8; pixel_count * components];
            for pixel in 0..pixel_count {
                out[pixel * components + components - 1] = u8::MAX;
            }
            for (id, data) in &planes {
                let Some(component) = component_index(*id, components) else {
                    continue;
                };
                let invert = layout.stores_inverted() && *id >= 0;
                for pixel in 0..pixel_count {
                    let value = data[pixel];
                    out[pixel * components + component] =
                        if invert { u8::MAX - value } else { value };
                }
            }
            Samples::Eight(out)
        }
        _ => {
            let mut out = vec![0u16; pixel_count * components];
            for pixel in 0..pixel_count {
                out[pixel * components + components - 1] = u16::MAX;
            }
            for (id, data) in &planes {
                let Some(component) = component_index(*id, components) else {
                    continue;
                };
                let invert = layout.stores_inverted() && *id >= 0;
                for pixel in 0..pixel_count {
                    // Stream stores big-endian samples
                    let value = u16::from_be_bytes([data[pixel * 2], data[pixel * 2 + 1]]);
                    out[pixel * components + component] =
                        if invert { u16::MAX - value } else { value };
                }
            }
            Samples::Sixteen(out)
        }
    };

    Ok(PixelBuffer {
        width,
        height,
        components,
        samples,
    })
}

/// Interleaved lane for a channel id: color ids in order, alpha last
fn component_index(id: i16, components: usize) -> Option<usize> {
    if id == TRANSPARENCY_CHANNEL {
        Some(components - 1)
    } else if (id as usize) < components - 1 {
        Some(id as usize)
    } else {
        None
    }
}

/// Decode one channel region into raw big-endian row-major bytes
fn decode_channel<S: AsRef<[u8]>>(
    cursor: &mut ByteCursor<S>,
    row_bytes: usize,
    height: usize,
) -> CodecResult<Vec<u8>> {
    let mode = cursor.read_u16()?;
    match mode {
        COMPRESSION_RAW => cursor.read_bytes(row_bytes * height),

        COMPRESSION_RLE => {
            // The channel-local per-row length table precedes the row data
            let mut row_lengths = Vec::with_capacity(height);
            for _ in 0..height {
                row_lengths.push(cursor.read_u16()? as usize);
            }
            let mut data = Vec::with_capacity(row_bytes * height);
            for length in row_lengths {
                let compressed = cursor.read_bytes(length)?;
                data.extend_from_slice(&rle::decompress_row(&compressed, row_bytes)?);
            }
            Ok(data)
        }

        other => Err(CodecError::UnsupportedCompression(other)),
    }
}

/// Compress planar channels into the layer's pixel-data region
///
/// Every channel is written RLE-compressed with its per-row length table
/// reserved first and backpatched after the rows land. Returns the channel
/// table entries with final byte lengths for the caller to patch into the
/// serialized record.
pub fn pack(
    cursor: &mut WriteCursor,
    planes: &[ChannelPlane],
    bounds: &Bounds,
    header: &GlobalHeader,
) -> CodecResult<Vec<ChannelInfo>> {
    let layout = ColorLayout::for_header(header)?;
    bytes_per_sample(header.depth)?;
    let width = bounds.width();
    let height = bounds.height();

    let mut table = Vec::with_capacity(planes.len());
    for plane in planes {
        let depth_matches = matches!(
            (&plane.samples, header.depth),
            (Samples::Eight(_), 8) | (Samples::Sixteen(_), 16)
        );
        if !depth_matches {
            return Err(CodecError::UnsupportedChannelDepth(header.depth));
        }

        let invert = layout.stores_inverted() && plane.id >= 0;
        let start = cursor.position();
        cursor.write_u16(COMPRESSION_RLE)?;

        // Reserve the per-row length table
        let table_pos = cursor.position();
        for _ in 0..height {
            cursor.write_u16(0)?;
        }

        let mut row_lengths = Vec::with_capacity(height);
        for row in 0..height {
            let row_bytes = encode_row(&plane.samples, row, width, invert);
            let compressed = rle::compress_row(&row_bytes);
            row_lengths.push(compressed.len() as u16);
            cursor.write_bytes(&compressed)?;
        }

        // Backpatch the reserved table with real row sizes
        let end = cursor.position();
        cursor.seek(table_pos);
        for length in &row_lengths {
            cursor.write_u16(*length)?;
        }
        cursor.seek(end);

        table.push(ChannelInfo {
            id: plane.id,
            length: end - start,
        });
    }

    Ok(table)
}

/// One plane row as container bytes: complemented if the layout stores
/// inverted samples, 16-bit values in big-endian order
fn encode_row(samples: &Samples, row: usize, width: usize, invert: bool) -> Vec<u8> {
    match samples {
        Samples::Eight(data) => data[row * width..(row + 1) * width]
            .iter()
            .map(|&v| if invert { u8::MAX - v } else { v })
            .collect(),
        Samples::Sixteen(data) => {
            let mut out = Vec::with_capacity(width * 2);
            for &v in &data[row * width..(row + 1) * width] {
                let v = if invert { u16::MAX - v } else { v };
                out.extend_from_slice(&v.to_be_bytes());
            }
            out
        }
    }
}
