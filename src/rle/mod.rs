//! PackBits run-length compression for channel scanlines
//!
//! One compressed unit is a single row of channel bytes. Control bytes
//! 0..=127 introduce a literal run of N+1 bytes; 0x81..=0xFF introduce a
//! repeat run of 257-N identical bytes; 0x80 is a no-op. Repeat runs are
//! taken whenever two or more identical bytes line up, so a two-byte row of
//! equal bytes compresses to a two-byte repeat run.

use crate::{CodecError, CodecResult};

/// Longest run either control byte can express
const MAX_RUN: usize = 128;

/// Compress one row of channel bytes
pub fn compress_row(row: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(row.len() + row.len() / MAX_RUN + 1);
    let mut i = 0;

    while i < row.len() {
        let run = run_length(&row[i..]);

        if run >= 2 {
            // Repeat run: control byte is 257 - length in two's complement
            output.push((257 - run) as u8);
            output.push(row[i]);
            i += run;
        } else {
            // Literal run: extend until the next repeat run starts
            let start = i;
            i += 1;
            while i < row.len() && i - start < MAX_RUN && run_length(&row[i..]) < 2 {
                i += 1;
            }
            output.push((i - start - 1) as u8);
            output.extend_from_slice(&row[start..i]);
        }
    }

    output
}

/// Length of the repeat run starting at the head of `bytes`, capped at 128
fn run_length(bytes: &[u8]) -> usize {
    if bytes.is_empty() {
        return 0;
    }
    let mut len = 1;
    while len < bytes.len() && len < MAX_RUN && bytes[len] == bytes[0] {
        len += 1;
    }
    len
}

/// Decompress one row, which must expand to exactly `expected_len` bytes
pub fn decompress_row(compressed: &[u8], expected_len: usize) -> CodecResult<Vec<u8>> {
    let mut output = Vec::with_capacity(expected_len);
    let mut pos = 0;

    while pos < compressed.len() {
        let control = compressed[pos] as i8;
        pos += 1;

        match control {
            -128 => continue, // no-op filler

            0..=127 => {
                let count = control as usize + 1;
                if pos + count > compressed.len() {
                    return Err(CodecError::CorruptRle(format!(
                        "literal run of {} bytes overruns input ({} left)",
                        count,
                        compressed.len() - pos
                    )));
                }
                output.extend_from_slice(&compressed[pos..pos + count]);
                pos += count;
            }

            _ => {
                let count = 1 - control as isize;
                if pos >= compressed.len() {
                    return Err(CodecError::CorruptRle(
                        "repeat run missing its value byte".to_string(),
                    ));
                }
                let value = compressed[pos];
                pos += 1;
                output.resize(output.len() + count as usize, value);
            }
        }

        if output.len() > expected_len {
            return Err(CodecError::CorruptRle(format!(
                "row expanded to {} bytes, expected {}",
                output.len(),
                expected_len
            )));
        }
    }

    if output.len() != expected_len {
        return Err(CodecError::CorruptRle(format!(
            "row expanded to {} bytes, expected {}",
            output.len(),
            expected_len
        )));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_compress_empty_row() {
        assert!(compress_row(&[]).is_empty());
    }

    #[test]
    fn test_compress_single_byte() {
        assert_eq!(compress_row(&[0x2A]), vec![0x00, 0x2A]);
    }

    #[test]
    fn test_compress_pair_as_repeat_run() {
        // Two identical bytes make a repeat run: tag 257 - 2 = 0xFF
        assert_eq!(compress_row(&[0x80, 0x80]), vec![0xFF, 0x80]);
    }

    #[test]
    fn test_compress_long_run() {
        assert_eq!(compress_row(&[0xAA; 5]), vec![0xFC, 0xAA]);
    }

    #[test]
    fn test_compress_run_longer_than_128() {
        let compressed = compress_row(&[0x11; 130]);
        // 128-byte run, then a 2-byte run
        assert_eq!(compressed, vec![0x81, 0x11, 0xFF, 0x11]);
    }

    #[test]
    fn test_compress_literal_then_run() {
        let compressed = compress_row(&[1, 2, 3, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA]);
        assert_eq!(compressed, vec![2, 1, 2, 3, 0xFC, 0xAA]);
    }

    #[test]
    fn test_decompress_literal() {
        let row = decompress_row(&[3, 1, 2, 3, 4], 4).unwrap();
        assert_eq!(row, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_decompress_repeat() {
        let row = decompress_row(&[0xFC, 0xAA], 5).unwrap();
        assert_eq!(row, vec![0xAA; 5]);
    }

    #[test]
    fn test_decompress_skips_noop() {
        let row = decompress_row(&[0x80, 0x01, 0x41, 0x42], 2).unwrap();
        assert_eq!(row, vec![0x41, 0x42]);
    }

    #[test]
    fn test_decompress_length_mismatch() {
        let result = decompress_row(&[0xFC, 0xAA], 4);
        assert!(matches!(result, Err(CodecError::CorruptRle(_))));
    }

    #[test]
    fn test_decompress_literal_overrun() {
        // Control byte promises 4 literal bytes, input only has 2
        let result = decompress_row(&[3, 1, 2], 4);
        assert!(matches!(result, Err(CodecError::CorruptRle(_))));
    }

    #[test]
    fn test_decompress_missing_repeat_value() {
        let result = decompress_row(&[0xFE], 3);
        assert!(matches!(result, Err(CodecError::CorruptRle(_))));
    }

    #[test]
    fn test_roundtrip_mixed_row() {
        let mut row = Vec::new();
        row.extend(std::iter::repeat(0u8).take(100));
        row.extend((0..50).map(|i| (i * 7) as u8));
        row.extend(std::iter::repeat(255u8).take(80));

        let compressed = compress_row(&row);
        assert!(compressed.len() < row.len());
        assert_eq!(decompress_row(&compressed, row.len()).unwrap(), row);
    }

    proptest! {
        #[test]
        fn prop_roundtrip(row in proptest::collection::vec(any::<u8>(), 0..1024)) {
            let compressed = compress_row(&row);
            let decompressed = decompress_row(&compressed, row.len()).unwrap();
            prop_assert_eq!(decompressed, row);
        }

        #[test]
        fn prop_roundtrip_runs(value in any::<u8>(), len in 0usize..600) {
            let row = vec![value; len];
            let compressed = compress_row(&row);
            let decompressed = decompress_row(&compressed, row.len()).unwrap();
            prop_assert_eq!(decompressed, row);
        }
    }
}
