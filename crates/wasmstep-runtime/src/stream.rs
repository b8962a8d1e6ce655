//! Byte streams for heap state snapshots.
//!
//! Minimal little-endian writer/reader pair used by `Heap::serialize` and
//! `Heap::set_state`. The writer appends to an owned `Vec<u8>`; the reader
//! walks a borrowed slice and fails with `UnexpectedEof` instead of
//! panicking on short input.

use alloc::vec::Vec;

/// Errors produced while reading from a [`ByteInputStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// The stream ended before the requested bytes could be read.
    UnexpectedEof,
}

impl core::fmt::Display for StreamError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StreamError::UnexpectedEof => f.write_str("unexpected end of stream"),
        }
    }
}

/// Append-only byte sink.
#[derive(Debug, Default)]
pub struct ByteOutputStream {
    bytes: Vec<u8>,
}

impl ByteOutputStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a `u64` in little-endian byte order.
    pub fn write_u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Write raw bytes verbatim.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// View of everything written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the stream, yielding the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Cursor over a borrowed byte slice.
#[derive(Debug)]
pub struct ByteInputStream<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteInputStream<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Read a little-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64, StreamError> {
        let slice = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(slice);
        Ok(u64::from_le_bytes(buf))
    }

    /// Read exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], StreamError> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(StreamError::UnexpectedEof)?;
        if end > self.bytes.len() {
            return Err(StreamError::UnexpectedEof);
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}
