//! Binary reading and writing utilities for the arena protocol.
//!
//! All values are little-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::Color;

/// A reader for parsing binary protocol messages.
///
/// Every getter is checked: it returns `None` instead of panicking when the
/// buffer runs short, so a truncated packet can never take the server down.
#[derive(Debug)]
pub struct BinaryReader {
    buf: Bytes,
}

impl BinaryReader {
    /// Create a new reader from raw bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { buf: data.into() }
    }

    /// Returns remaining bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    #[inline]
    pub fn try_get_u8(&mut self) -> Option<u8> {
        if self.buf.remaining() >= 1 {
            Some(self.buf.get_u8())
        } else {
            None
        }
    }

    #[inline]
    pub fn try_get_u16(&mut self) -> Option<u16> {
        if self.buf.remaining() >= 2 {
            Some(self.buf.get_u16_le())
        } else {
            None
        }
    }

    #[inline]
    pub fn try_get_u32(&mut self) -> Option<u32> {
        if self.buf.remaining() >= 4 {
            Some(self.buf.get_u32_le())
        } else {
            None
        }
    }

    #[inline]
    pub fn try_get_u64(&mut self) -> Option<u64> {
        if self.buf.remaining() >= 8 {
            Some(self.buf.get_u64_le())
        } else {
            None
        }
    }

    #[inline]
    pub fn try_get_f32(&mut self) -> Option<f32> {
        if self.buf.remaining() >= 4 {
            Some(self.buf.get_f32_le())
        } else {
            None
        }
    }

    #[inline]
    pub fn try_get_f64(&mut self) -> Option<f64> {
        if self.buf.remaining() >= 8 {
            Some(self.buf.get_f64_le())
        } else {
            None
        }
    }

    /// Read three bytes as an RGB color.
    pub fn try_get_color(&mut self) -> Option<Color> {
        if self.buf.remaining() >= 3 {
            Some(Color::new(self.buf.get_u8(), self.buf.get_u8(), self.buf.get_u8()))
        } else {
            None
        }
    }

    /// Read a null-terminated UTF-8 string.
    ///
    /// Returns `None` only when the buffer is already exhausted; a missing
    /// terminator just ends the string at the end of the buffer.
    pub fn try_get_string_utf8(&mut self) -> Option<String> {
        if !self.buf.has_remaining() {
            return None;
        }
        let mut bytes = Vec::new();
        while self.buf.has_remaining() {
            let b = self.buf.get_u8();
            if b == 0 {
                break;
            }
            bytes.push(b);
        }
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// A writer for building binary protocol messages.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buf: BytesMut,
}

impl BinaryWriter {
    /// Create a new writer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new writer with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the current length.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    #[inline]
    pub fn put_u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    #[inline]
    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    #[inline]
    pub fn put_u64(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    #[inline]
    pub fn put_f32(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    #[inline]
    pub fn put_f64(&mut self, v: f64) {
        self.buf.put_f64_le(v);
    }

    #[inline]
    pub fn put_color(&mut self, color: Color) {
        self.buf.put_u8(color.r);
        self.buf.put_u8(color.g);
        self.buf.put_u8(color.b);
    }

    /// Write a null-terminated UTF-8 string.
    pub fn put_string_utf8(&mut self, s: &str) {
        self.buf.put_slice(s.as_bytes());
        self.buf.put_u8(0);
    }

    /// Consume the writer and return the built buffer.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    /// Get current buffer as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}
