//! Positioned, length-checked big-endian reader/writer over a byte stream
//!
//! Every other component of the codec is built on [`ByteCursor`]. Reads are
//! bounds-checked up front and fail with `TruncatedStream`; writes go to an
//! in-memory sink (`WriteCursor`) so length fields can be backpatched with
//! plain seeks.

use std::io::{Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{CodecError, CodecResult};

/// Seekable big-endian cursor over any byte-slice-backed stream
#[derive(Debug, Clone)]
pub struct ByteCursor<S> {
    inner: Cursor<S>,
}

/// Cursor variant used by all writers; buffers into a `Vec<u8>` so that
/// reserve-then-backpatch length fields are ordinary seeks
pub type WriteCursor = ByteCursor<Vec<u8>>;

impl<S: AsRef<[u8]>> ByteCursor<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: Cursor::new(stream),
        }
    }

    /// Current stream position in bytes
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Reposition the cursor; positions past the end are legal and surface
    /// as truncation on the next read
    pub fn seek(&mut self, pos: u64) {
        self.inner.set_position(pos);
    }

    /// Bytes between the current position and the end of the stream
    pub fn bytes_remaining(&self) -> u64 {
        let len = self.inner.get_ref().as_ref().len() as u64;
        len.saturating_sub(self.inner.position())
    }

    fn truncated(&self, needed: u64) -> CodecError {
        CodecError::TruncatedStream {
            needed,
            available: self.bytes_remaining(),
        }
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        let err = self.truncated(1);
        self.inner.read_u8().map_err(|_| err)
    }

    pub fn read_u16(&mut self) -> CodecResult<u16> {
        let err = self.truncated(2);
        self.inner.read_u16::<BigEndian>().map_err(|_| err)
    }

    pub fn read_i16(&mut self) -> CodecResult<i16> {
        let err = self.truncated(2);
        self.inner.read_i16::<BigEndian>().map_err(|_| err)
    }

    pub fn read_u32(&mut self) -> CodecResult<u32> {
        let err = self.truncated(4);
        self.inner.read_u32::<BigEndian>().map_err(|_| err)
    }

    pub fn read_i32(&mut self) -> CodecResult<i32> {
        let err = self.truncated(4);
        self.inner.read_i32::<BigEndian>().map_err(|_| err)
    }

    pub fn read_u64(&mut self) -> CodecResult<u64> {
        let err = self.truncated(8);
        self.inner.read_u64::<BigEndian>().map_err(|_| err)
    }

    /// Read a 4-byte tag (signature or key)
    pub fn read_4cc(&mut self) -> CodecResult<[u8; 4]> {
        let mut tag = [0u8; 4];
        let err = self.truncated(4);
        self.inner.read_exact(&mut tag).map_err(|_| err)?;
        Ok(tag)
    }

    pub fn read_bytes(&mut self, n: usize) -> CodecResult<Vec<u8>> {
        if self.bytes_remaining() < n as u64 {
            return Err(self.truncated(n as u64));
        }
        let mut buf = vec![0u8; n];
        let err = self.truncated(n as u64);
        self.inner.read_exact(&mut buf).map_err(|_| err)?;
        Ok(buf)
    }

    /// Read a 4-byte tag without consuming it
    pub fn peek_4cc(&self) -> CodecResult<[u8; 4]> {
        let bytes = self.peek_bytes(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Look at the next `n` bytes without consuming them
    pub fn peek_bytes(&self, n: usize) -> CodecResult<&[u8]> {
        let data = self.inner.get_ref().as_ref();
        let pos = self.inner.position() as usize;
        if data.len().saturating_sub(pos) < n {
            return Err(self.truncated(n as u64));
        }
        Ok(&data[pos..pos + n])
    }

    pub fn skip(&mut self, n: u64) -> CodecResult<()> {
        if self.bytes_remaining() < n {
            return Err(self.truncated(n));
        }
        let pos = self.inner.position();
        self.inner.set_position(pos + n);
        Ok(())
    }
}

impl ByteCursor<Vec<u8>> {
    /// Fresh empty sink positioned at zero
    pub fn for_writing() -> Self {
        Self {
            inner: Cursor::new(Vec::new()),
        }
    }

    /// Consume the cursor and hand back the written bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.inner.into_inner()
    }

    pub fn write_u8(&mut self, value: u8) -> CodecResult<()> {
        self.inner.write_u8(value).map_err(CodecError::WriteFailed)
    }

    pub fn write_u16(&mut self, value: u16) -> CodecResult<()> {
        self.inner
            .write_u16::<BigEndian>(value)
            .map_err(CodecError::WriteFailed)
    }

    pub fn write_i16(&mut self, value: i16) -> CodecResult<()> {
        self.inner
            .write_i16::<BigEndian>(value)
            .map_err(CodecError::WriteFailed)
    }

    pub fn write_u32(&mut self, value: u32) -> CodecResult<()> {
        self.inner
            .write_u32::<BigEndian>(value)
            .map_err(CodecError::WriteFailed)
    }

    pub fn write_i32(&mut self, value: i32) -> CodecResult<()> {
        self.inner
            .write_i32::<BigEndian>(value)
            .map_err(CodecError::WriteFailed)
    }

    pub fn write_u64(&mut self, value: u64) -> CodecResult<()> {
        self.inner
            .write_u64::<BigEndian>(value)
            .map_err(CodecError::WriteFailed)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.inner.write_all(bytes).map_err(CodecError::WriteFailed)
    }
}
