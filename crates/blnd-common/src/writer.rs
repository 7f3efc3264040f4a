//! Seekable little-endian byte writer.

use byteorder::{ByteOrder, LittleEndian};
use zerocopy::{Immutable, IntoBytes};

/// A seekable little-endian writer.
///
/// Writes past the current end grow the buffer, zero-filling any gap. A
/// counting writer tracks positions and length exactly like a buffered one
/// but discards the bytes, which is what size-estimation passes need.
#[derive(Debug, Clone, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
    position: usize,
    len: usize,
    counting: bool,
}

impl ByteWriter {
    /// Create a writer backed by a growable buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with a pre-sized, zero-filled buffer.
    pub fn with_len(len: usize) -> Self {
        Self {
            buf: vec![0; len],
            position: 0,
            len: 0,
            counting: false,
        }
    }

    /// Create a writer that only tracks positions.
    pub fn counting() -> Self {
        Self {
            counting: true,
            ..Self::default()
        }
    }

    /// Get the current position.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get the furthest position written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if nothing has been written yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Seek to an absolute position.
    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    fn reserve(&mut self, count: usize) -> Option<&mut [u8]> {
        let start = self.position;
        let end = start + count;
        self.position = end;
        self.len = self.len.max(end);

        if self.counting {
            return None;
        }
        if self.buf.len() < end {
            self.buf.resize(end, 0);
        }
        Some(&mut self.buf[start..end])
    }

    /// Write raw bytes at the current position.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if let Some(dst) = self.reserve(bytes.len()) {
            dst.copy_from_slice(bytes);
        }
    }

    /// Write a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    /// Write a little-endian u16.
    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        if let Some(dst) = self.reserve(2) {
            LittleEndian::write_u16(dst, value);
        }
    }

    /// Write a little-endian u32.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        if let Some(dst) = self.reserve(4) {
            LittleEndian::write_u32(dst, value);
        }
    }

    /// Write a little-endian i32.
    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        if let Some(dst) = self.reserve(4) {
            LittleEndian::write_i32(dst, value);
        }
    }

    /// Write a little-endian f32.
    #[inline]
    pub fn write_f32(&mut self, value: f32) {
        if let Some(dst) = self.reserve(4) {
            LittleEndian::write_f32(dst, value);
        }
    }

    /// Write a null-terminated string.
    pub fn write_cstring(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
        self.write_u8(0);
    }

    /// Write a string into a fixed-size, null-padded field.
    ///
    /// Strings that do not fit are truncated to `field_size - 1` bytes (at a
    /// character boundary) so the field always ends with a terminator.
    pub fn write_fixed_string(&mut self, value: &str, field_size: usize) {
        if field_size == 0 {
            return;
        }
        let mut end = value.len().min(field_size - 1);
        while !value.is_char_boundary(end) {
            end -= 1;
        }

        if let Some(dst) = self.reserve(field_size) {
            dst[..end].copy_from_slice(&value.as_bytes()[..end]);
            dst[end..].fill(0);
        }
    }

    /// Write a struct using zerocopy.
    #[inline]
    pub fn write_struct<T: IntoBytes + Immutable + ?Sized>(&mut self, value: &T) {
        self.write_bytes(value.as_bytes());
    }

    /// Consume the writer and return the bytes written.
    ///
    /// The result is exactly `len()` bytes long; a counting writer returns an
    /// empty vector.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buf.truncate(self.len);
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_primitives() {
        let mut writer = ByteWriter::new();
        writer.write_u32(0x04030201);
        writer.write_i32(-1);
        writer.write_u16(0x1234);
        writer.write_u32(1);

        assert_eq!(
            writer.into_bytes(),
            vec![1, 2, 3, 4, 0xFF, 0xFF, 0xFF, 0xFF, 0x34, 0x12, 1, 0, 0, 0]
        );
    }

    #[test]
    fn test_seek_back_and_patch() {
        let mut writer = ByteWriter::new();
        writer.write_u32(0);
        writer.write_u32(0xAABBCCDD);
        writer.seek(0);
        writer.write_u32(8);

        assert_eq!(writer.position(), 4);
        assert_eq!(writer.len(), 8);
        assert_eq!(&writer.into_bytes()[..4], &8u32.to_le_bytes());
    }

    #[test]
    fn test_write_past_end_zero_fills() {
        let mut writer = ByteWriter::new();
        writer.seek(6);
        writer.write_u16(0xFFFF);
        assert_eq!(writer.into_bytes(), vec![0, 0, 0, 0, 0, 0, 0xFF, 0xFF]);
    }

    #[test]
    fn test_counting_tracks_length_only() {
        let mut writer = ByteWriter::counting();
        writer.write_cstring("abc");
        writer.write_fixed_string("name", 32);

        assert_eq!(writer.position(), 36);
        assert_eq!(writer.len(), 36);
        assert!(writer.into_bytes().is_empty());
    }

    #[test]
    fn test_fixed_string_widths() {
        for (len, kept) in [(31usize, 31usize), (32, 31), (40, 31), (5, 5)] {
            let name = "n".repeat(len);
            let mut writer = ByteWriter::new();
            writer.write_fixed_string(&name, 32);
            let bytes = writer.into_bytes();

            assert_eq!(bytes.len(), 32);
            assert!(bytes[..kept].iter().all(|&b| b == b'n'));
            assert!(bytes[kept..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_fixed_string_respects_char_boundary() {
        let mut writer = ByteWriter::new();
        // 'é' is two bytes; 3 x 'é' = 6 bytes does not fit in 5 usable bytes
        writer.write_fixed_string("ééé", 6);
        let bytes = writer.into_bytes();
        assert_eq!(&bytes[..4], "éé".as_bytes());
        assert_eq!(&bytes[4..], &[0, 0]);
    }
}
