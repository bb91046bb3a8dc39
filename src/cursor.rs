//! Appendable byte buffer with independent read and write positions.
//!
//! [`ByteCursor`] is the storage every codec and the document framing layer
//! work against. Writes always append at the write position; reads consume
//! from the read position up to the read limit.
//!
//! ## Examples
//!
//! ```rust
//! use serde_wire::ByteCursor;
//!
//! let mut cursor = ByteCursor::new();
//! cursor.append("key: 42");
//! assert_eq!(cursor.read_remaining(), 7);
//! assert_eq!(cursor.read_byte(), Some(b'k'));
//! assert_eq!(cursor.peek_byte(), Some(b'e'));
//! ```

use bytes::{BufMut, BytesMut};
use std::fmt;

/// An appendable, randomly addressable byte buffer.
///
/// The write position is the length of the buffer; moving it backwards
/// truncates. The read limit defaults to the write position.
#[derive(Clone, Default)]
pub struct ByteCursor {
    buf: BytesMut,
    read_pos: usize,
    read_limit: Option<usize>,
}

impl ByteCursor {
    /// Creates an empty cursor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cursor with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        ByteCursor {
            buf: BytesMut::with_capacity(capacity),
            read_pos: 0,
            read_limit: None,
        }
    }

    /// Creates a cursor holding a copy of `bytes`, positioned to read them.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        ByteCursor {
            buf: BytesMut::from(bytes),
            read_pos: 0,
            read_limit: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn read_position(&self) -> usize {
        self.read_pos
    }

    /// Moves the read position, clamped to the write position.
    #[inline]
    pub fn set_read_position(&mut self, position: usize) {
        self.read_pos = position.min(self.buf.len());
    }

    #[inline]
    #[must_use]
    pub fn write_position(&self) -> usize {
        self.buf.len()
    }

    /// Moves the write position backwards, discarding everything after it.
    ///
    /// Positions past the current end are ignored.
    pub fn set_write_position(&mut self, position: usize) {
        if position < self.buf.len() {
            self.buf.truncate(position);
            if self.read_pos > position {
                self.read_pos = position;
            }
        }
    }

    /// The effective read limit: an explicit limit if set, never before the
    /// read position and never past the end.
    #[inline]
    #[must_use]
    pub fn read_limit(&self) -> usize {
        self.read_limit.map_or(self.buf.len(), |limit| {
            limit.max(self.read_pos).min(self.buf.len())
        })
    }

    /// Sets an explicit read limit, or `None` to read up to the write position.
    pub fn set_read_limit(&mut self, limit: Option<usize>) {
        self.read_limit = limit;
    }

    /// Bytes left between the read position and the read limit.
    #[inline]
    #[must_use]
    pub fn read_remaining(&self) -> usize {
        self.read_limit().saturating_sub(self.read_pos)
    }

    /// Consumes one byte.
    #[inline]
    pub fn read_byte(&mut self) -> Option<u8> {
        let byte = self.peek_byte()?;
        self.read_pos += 1;
        Some(byte)
    }

    #[inline]
    #[must_use]
    pub fn peek_byte(&self) -> Option<u8> {
        self.peek_at(self.read_pos)
    }

    /// Reads the byte at an absolute position without moving, honouring the limit.
    #[inline]
    #[must_use]
    pub fn peek_at(&self, position: usize) -> Option<u8> {
        if position < self.read_limit() {
            Some(self.buf[position])
        } else {
            None
        }
    }

    /// Consumes `len` bytes, or nothing if fewer remain.
    pub fn read_slice(&mut self, len: usize) -> Option<&[u8]> {
        if self.read_remaining() < len {
            return None;
        }
        let start = self.read_pos;
        self.read_pos += len;
        Some(&self.buf[start..start + len])
    }

    /// Bytes between the read position and the read limit.
    #[must_use]
    pub fn readable(&self) -> &[u8] {
        &self.buf[self.read_pos..self.read_limit()]
    }

    /// Every byte written so far.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buf.put_u8(byte);
    }

    #[inline]
    pub fn write_slice(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Appends the UTF-8 bytes of `text`.
    #[inline]
    pub fn append(&mut self, text: &str) {
        self.buf.put_slice(text.as_bytes());
    }

    pub fn write_u32_le(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    /// Overwrites four already written bytes at `position`.
    ///
    /// Returns `false` when the range is not fully inside the buffer.
    pub fn write_u32_le_at(&mut self, position: usize, value: u32) -> bool {
        match self.buf.get_mut(position..position + 4) {
            Some(slot) => {
                slot.copy_from_slice(&value.to_le_bytes());
                true
            }
            None => false,
        }
    }

    /// Reads a little-endian `u32` at an absolute position without moving.
    ///
    /// Unlike [`peek_at`](Self::peek_at), this ignores the read limit.
    #[must_use]
    pub fn peek_u32_le(&self, position: usize) -> Option<u32> {
        let bytes = self.buf.get(position..position + 4)?;
        let mut word = [0u8; 4];
        word.copy_from_slice(bytes);
        Some(u32::from_le_bytes(word))
    }

    /// Drops all content and resets both positions.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.read_pos = 0;
        self.read_limit = None;
    }
}

impl fmt::Debug for ByteCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteCursor")
            .field("read_position", &self.read_pos)
            .field("read_limit", &self.read_limit())
            .field("write_position", &self.buf.len())
            .finish()
    }
}
