//! Bounds-checked binary reader with cursor tracking.

use std::str;

use crate::BufferError;

/// A binary reader over a borrowed byte slice.
///
/// Every read is checked against `end` and returns
/// [`BufferError::EndOfBuffer`] instead of panicking, leaving the cursor
/// where it was. A decoder can therefore tell "ran out of bytes" apart from
/// any other failure.
///
/// # Example
///
/// ```
/// use typepack_buffers::{BufferError, Reader};
///
/// let data = [0x01, 0x02, 0x03];
/// let mut reader = Reader::new(&data);
///
/// assert_eq!(reader.try_u8(), Ok(0x01));
/// assert_eq!(reader.try_u16(), Ok(0x0203));
/// assert_eq!(reader.try_u8(), Err(BufferError::EndOfBuffer));
/// ```
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    /// Input bytes.
    pub uint8: &'a [u8],
    /// Current cursor position.
    pub x: usize,
    /// End position (exclusive).
    pub end: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader for the given byte slice.
    pub fn new(uint8: &'a [u8]) -> Self {
        let end = uint8.len();
        Self { uint8, x: 0, end }
    }

    /// Creates a reader starting at `x`. Positions past the end are clamped.
    pub fn at(uint8: &'a [u8], x: usize) -> Self {
        let end = uint8.len();
        Self {
            uint8,
            x: x.min(end),
            end,
        }
    }

    /// Returns the number of remaining bytes.
    pub fn size(&self) -> usize {
        self.end - self.x
    }

    /// Checks that `n` more bytes are available from the current cursor.
    #[inline]
    fn check(&self, n: usize) -> Result<(), BufferError> {
        if n > self.size() {
            Err(BufferError::EndOfBuffer)
        } else {
            Ok(())
        }
    }

    #[inline]
    fn take<const N: usize>(&mut self) -> Result<[u8; N], BufferError> {
        self.check(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.uint8[self.x..self.x + N]);
        self.x += N;
        Ok(out)
    }

    /// Reads an unsigned 8-bit integer.
    #[inline]
    pub fn try_u8(&mut self) -> Result<u8, BufferError> {
        self.check(1)?;
        let val = self.uint8[self.x];
        self.x += 1;
        Ok(val)
    }

    #[inline]
    pub fn try_i8(&mut self) -> Result<i8, BufferError> {
        self.try_u8().map(|v| v as i8)
    }

    #[inline]
    pub fn try_u16(&mut self) -> Result<u16, BufferError> {
        self.take().map(u16::from_be_bytes)
    }

    #[inline]
    pub fn try_i16(&mut self) -> Result<i16, BufferError> {
        self.take().map(i16::from_be_bytes)
    }

    #[inline]
    pub fn try_u32(&mut self) -> Result<u32, BufferError> {
        self.take().map(u32::from_be_bytes)
    }

    #[inline]
    pub fn try_i32(&mut self) -> Result<i32, BufferError> {
        self.take().map(i32::from_be_bytes)
    }

    #[inline]
    pub fn try_u64(&mut self) -> Result<u64, BufferError> {
        self.take().map(u64::from_be_bytes)
    }

    #[inline]
    pub fn try_i64(&mut self) -> Result<i64, BufferError> {
        self.take().map(i64::from_be_bytes)
    }

    #[inline]
    pub fn try_f32(&mut self) -> Result<f32, BufferError> {
        self.take().map(f32::from_be_bytes)
    }

    #[inline]
    pub fn try_f64(&mut self) -> Result<f64, BufferError> {
        self.take().map(f64::from_be_bytes)
    }

    /// Reads `size` raw bytes and advances the cursor.
    pub fn try_buf(&mut self, size: usize) -> Result<&'a [u8], BufferError> {
        self.check(size)?;
        let x = self.x;
        let end = x + size;
        let bin = &self.uint8[x..end];
        self.x = end;
        Ok(bin)
    }

    /// Reads a UTF-8 string of `size` bytes.
    ///
    /// On invalid UTF-8 the cursor is left at the start of the string.
    pub fn try_utf8(&mut self, size: usize) -> Result<&'a str, BufferError> {
        self.check(size)?;
        let start = self.x;
        let s = str::from_utf8(&self.uint8[start..start + size])
            .map_err(|_| BufferError::InvalidUtf8)?;
        self.x += size;
        Ok(s)
    }

    /// Splits off a reader over the next `size` bytes and advances past them.
    ///
    /// The returned reader cannot see anything beyond those `size` bytes.
    pub fn try_cut(&mut self, size: usize) -> Result<Reader<'a>, BufferError> {
        let bin = self.try_buf(size)?;
        Ok(Reader::new(bin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8() {
        let data = [0x01, 0x02, 0x03];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_u8(), Ok(0x01));
        assert_eq!(reader.try_u8(), Ok(0x02));
        assert_eq!(reader.size(), 1);
    }

    #[test]
    fn test_u8_out_of_bounds() {
        let mut reader = Reader::new(&[]);
        assert_eq!(reader.try_u8(), Err(BufferError::EndOfBuffer));
        assert_eq!(reader.x, 0);
    }

    #[test]
    fn test_multi_byte_reads_big_endian() {
        let data = [
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        ];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_u16(), Ok(0x0102));
        assert_eq!(reader.try_u32(), Ok(0x03040506));
        assert_eq!(reader.try_u64(), Ok(0x0708090a0b0c0d0e));
    }

    #[test]
    fn test_signed_reads() {
        let data = [0xff, 0xff, 0xfe, 0xff, 0xff, 0xff, 0xfd];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_i8(), Ok(-1));
        assert_eq!(reader.try_i16(), Ok(-2));
        assert_eq!(reader.try_i32(), Ok(-3));
    }

    #[test]
    fn test_i64_and_floats() {
        let mut data = Vec::new();
        data.extend_from_slice(&(-5i64).to_be_bytes());
        data.extend_from_slice(&1.5f32.to_be_bytes());
        data.extend_from_slice(&(-0.125f64).to_be_bytes());
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_i64(), Ok(-5));
        assert_eq!(reader.try_f32(), Ok(1.5));
        assert_eq!(reader.try_f64(), Ok(-0.125));
        assert_eq!(reader.size(), 0);
    }

    #[test]
    fn test_short_read_leaves_cursor() {
        let data = [0x01, 0x02, 0x03];
        let mut reader = Reader::new(&data);
        reader.try_u8().unwrap();
        assert_eq!(reader.try_u32(), Err(BufferError::EndOfBuffer));
        assert_eq!(reader.x, 1);
        assert_eq!(reader.try_u16(), Ok(0x0203));
    }

    #[test]
    fn test_buf_and_utf8() {
        let data = b"\x01hello";
        let mut reader = Reader::new(data);
        assert_eq!(reader.try_buf(1), Ok(&[0x01][..]));
        assert_eq!(reader.try_buf(6), Err(BufferError::EndOfBuffer));
        assert_eq!(reader.try_utf8(5), Ok("hello"));
    }

    #[test]
    fn test_invalid_utf8() {
        let data = [0xff, 0xfe];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_utf8(2), Err(BufferError::InvalidUtf8));
        assert_eq!(reader.x, 0);
    }

    #[test]
    fn test_at_offset() {
        let data = [0x00, 0x00, 0x2a];
        let mut reader = Reader::at(&data, 2);
        assert_eq!(reader.try_u8(), Ok(0x2a));
        let reader = Reader::at(&data, 10);
        assert_eq!(reader.size(), 0);
    }

    #[test]
    fn test_cut_isolates_payload() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut reader = Reader::new(&data);
        let mut sub = reader.try_cut(2).unwrap();
        assert_eq!(reader.try_u8(), Ok(0x03));
        assert_eq!(sub.try_u16(), Ok(0x0102));
        assert_eq!(sub.try_u8(), Err(BufferError::EndOfBuffer));
    }
}
