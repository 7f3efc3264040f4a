//! Bounds-checked byte cursor for random-access decoding.
//!
//! This module provides [`ByteCursor`], a cursor over a byte slice that reads
//! little-endian scalars, strings, and zerocopy structs, and supports the
//! absolute seeks that offset chasing requires.

use zerocopy::FromBytes;

use crate::{Error, OffsetBase, Result};

/// A seekable little-endian reader over a byte slice.
///
/// No operation reads past the end of the buffer; doing so fails with
/// [`Error::Bounds`] and leaves the position unchanged.
///
/// # Example
///
/// ```
/// use blnd_common::{ByteCursor, OffsetBase};
///
/// let data = [0x08, 0x00, 0x00, 0x00, 0xAA, 0xBB, 0xCC, 0xDD, b'h', b'i', 0];
/// let mut cursor = ByteCursor::new(&data);
///
/// let target = cursor.read_offset(OffsetBase::Field).unwrap();
/// assert_eq!(target, Some(8));
/// cursor.seek(8).unwrap();
/// assert_eq!(cursor.read_cstring().unwrap(), "hi");
/// ```
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a new cursor at the start of a byte slice.
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Get the current position in the buffer.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Get the total length of the underlying buffer.
    #[inline]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the underlying buffer is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the number of bytes remaining to read.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    fn out_of_bounds(&self, offset: usize, needed: usize) -> Error {
        Error::Bounds {
            offset,
            needed,
            len: self.data.len(),
        }
    }

    /// Seek to an absolute position.
    ///
    /// Seeking to the end of the buffer is allowed; seeking past it is not.
    #[inline]
    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(self.out_of_bounds(position, 0));
        }
        self.position = position;
        Ok(())
    }

    /// Advance the position by a number of bytes.
    #[inline]
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.read_bytes(count).map(|_| ())
    }

    /// Peek at bytes without advancing the position.
    #[inline]
    pub fn peek_bytes(&self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(self.out_of_bounds(self.position, count));
        }
        Ok(&self.data[self.position..self.position + count])
    }

    /// Read bytes and advance the position.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(count)?;
        self.position += count;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    /// Read a little-endian u16.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Read a little-endian u32.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Read a little-endian i32.
    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Read a little-endian f32.
    #[inline]
    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_array().map(f32::from_le_bytes)
    }

    /// Peek at a u32 located `delta` bytes past the current position.
    ///
    /// The position is not changed.
    pub fn peek_u32_at(&self, delta: usize) -> Result<u32> {
        let start = self.position.saturating_add(delta);
        let bytes = self
            .data
            .get(start..start.saturating_add(4))
            .ok_or_else(|| self.out_of_bounds(start, 4))?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a relative offset field and resolve it to an absolute position.
    ///
    /// Returns `None` for a zero delta, which means the referenced record is
    /// absent. The base is resolved against the position of the field itself
    /// (before the read).
    pub fn read_offset(&mut self, base: OffsetBase) -> Result<Option<usize>> {
        let field = self.position;
        let delta = self.read_i32()?;
        if delta == 0 {
            return Ok(None);
        }

        let target = base.resolve(field) as i64 + i64::from(delta);
        usize::try_from(target)
            .ok()
            .filter(|&target| target < self.data.len())
            .map(Some)
            .ok_or_else(|| self.out_of_bounds(field, 4))
    }

    /// Read a null-terminated string of unbounded length.
    ///
    /// Advances exactly past the terminator.
    pub fn read_cstring(&mut self) -> Result<String> {
        let start = self.position;
        let remaining = &self.data[start.min(self.data.len())..];

        let null_pos = memchr::memchr(0, remaining)
            .ok_or_else(|| self.out_of_bounds(start, remaining.len() + 1))?;

        let text = std::str::from_utf8(&remaining[..null_pos])
            .map_err(|source| Error::Utf8 { offset: start, source })?;
        self.position = start + null_pos + 1;
        Ok(text.to_owned())
    }

    /// Read a string from a fixed-size buffer, stopping at the first null.
    ///
    /// Always advances by exactly `buffer_size` bytes.
    pub fn read_fixed_string(&mut self, buffer_size: usize) -> Result<String> {
        let start = self.position;
        let bytes = self.read_bytes(buffer_size)?;
        let end = memchr::memchr(0, bytes).unwrap_or(buffer_size);
        std::str::from_utf8(&bytes[..end])
            .map(str::to_owned)
            .map_err(|source| Error::Utf8 { offset: start, source })
    }

    /// Read a struct using zerocopy.
    ///
    /// The struct must implement `FromBytes` from the zerocopy crate.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let start = self.position;
        let bytes = self.read_bytes(size)?;
        T::read_from_bytes(bytes).map_err(|_| self.out_of_bounds(start, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives() {
        let data = [
            0x01u8, 0x02, 0x03, 0x04, // u32: 0x04030201
            0xFF, 0xFF, 0xFF, 0xFF, // i32: -1
            0x34, 0x12, // u16: 0x1234
        ];
        let mut cursor = ByteCursor::new(&data);

        assert_eq!(cursor.read_u32().unwrap(), 0x04030201);
        assert_eq!(cursor.read_i32().unwrap(), -1);
        assert_eq!(cursor.read_u16().unwrap(), 0x1234);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_read_cstring() {
        let data = b"hello\0world\0";
        let mut cursor = ByteCursor::new(data);

        assert_eq!(cursor.read_cstring().unwrap(), "hello");
        assert_eq!(cursor.position(), 6);
        assert_eq!(cursor.read_cstring().unwrap(), "world");
    }

    #[test]
    fn test_read_cstring_without_terminator() {
        let mut cursor = ByteCursor::new(b"abc");
        assert!(matches!(cursor.read_cstring(), Err(Error::Bounds { .. })));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_read_fixed_string_advances_full_width() {
        let mut data = [0u8; 36];
        data[..4].copy_from_slice(b"mask");
        data[5] = b'x'; // garbage after the terminator is discarded
        data[32..].copy_from_slice(&7u32.to_le_bytes());

        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_fixed_string(32).unwrap(), "mask");
        assert_eq!(cursor.position(), 32);
        assert_eq!(cursor.read_u32().unwrap(), 7);
    }

    #[test]
    fn test_read_fixed_string_unterminated() {
        let data = [b'a'; 8];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_fixed_string(8).unwrap(), "aaaaaaaa");
    }

    #[test]
    fn test_peek_does_not_advance() {
        let data = [0x00, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00];
        let cursor = ByteCursor::new(&data);

        assert_eq!(cursor.peek_u32_at(4).unwrap(), 5);
        assert_eq!(cursor.position(), 0);
        assert!(cursor.peek_u32_at(6).is_err());
    }

    #[test]
    fn test_read_offset_conventions() {
        let mut data = vec![0u8; 32];
        data[4..8].copy_from_slice(&8i32.to_le_bytes());
        data[8..12].copy_from_slice(&0i32.to_le_bytes());
        data[12..16].copy_from_slice(&(-4i32).to_le_bytes());

        let mut cursor = ByteCursor::new(&data);
        cursor.seek(4).unwrap();
        assert_eq!(cursor.read_offset(OffsetBase::Field).unwrap(), Some(12));
        assert_eq!(cursor.read_offset(OffsetBase::Record(0)).unwrap(), None);
        assert_eq!(cursor.read_offset(OffsetBase::Record(20)).unwrap(), Some(16));
    }

    #[test]
    fn test_read_offset_out_of_bounds() {
        let mut data = vec![0u8; 8];
        data[..4].copy_from_slice(&(-16i32).to_le_bytes());
        data[4..].copy_from_slice(&64i32.to_le_bytes());

        let mut cursor = ByteCursor::new(&data);
        assert!(matches!(
            cursor.read_offset(OffsetBase::Field),
            Err(Error::Bounds { offset: 0, .. })
        ));
        assert!(cursor.read_offset(OffsetBase::Field).is_err());
    }

    #[test]
    fn test_seek_bounds() {
        let data = [0u8; 4];
        let mut cursor = ByteCursor::new(&data);

        assert!(cursor.seek(4).is_ok());
        assert!(matches!(cursor.seek(5), Err(Error::Bounds { offset: 5, .. })));
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_eof_error() {
        let data = [0x01, 0x02];
        let mut cursor = ByteCursor::new(&data);

        assert!(cursor.read_u32().is_err());
        assert_eq!(cursor.position(), 0);
    }
}
