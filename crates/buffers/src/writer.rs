//! Growable byte writer with a single write cursor.

/// Generates one writer per numeric type, in network byte order.
macro_rules! big_endian {
    ($($name:ident => $t:ty),* $(,)?) => {
        $(
            #[inline]
            pub fn $name(&mut self, val: $t) {
                self.buf(&val.to_be_bytes());
            }
        )*
    };
}

/// Generates `marker byte + big-endian number` writers with one capacity check.
macro_rules! marker_then {
    ($($name:ident => $t:ty),* $(,)?) => {
        $(
            #[inline]
            pub fn $name(&mut self, marker: u8, val: $t) {
                const N: usize = std::mem::size_of::<$t>();
                self.ensure_capacity(1 + N);
                self.uint8[self.x] = marker;
                self.uint8[self.x + 1..self.x + 1 + N].copy_from_slice(&val.to_be_bytes());
                self.x += 1 + N;
            }
        )*
    };
}

/// Append-only byte buffer for encoders.
///
/// The write cursor only moves forward. When the backing buffer runs out of
/// room it is reallocated to at least twice its size, so a run of small writes
/// costs amortized O(1) each.
///
/// # Example
///
/// ```
/// use typepack_buffers::Writer;
///
/// let mut out = Writer::with_alloc_size(2);
/// out.u8(0xcd);
/// out.u16(0x0100);
/// assert_eq!(out.flush(), [0xcd, 0x01, 0x00]);
/// assert!(out.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Writer {
    /// Backing storage; only `uint8[x0..x]` is meaningful.
    pub uint8: Vec<u8>,
    /// Start of the bytes not yet handed out by [`Writer::flush`].
    pub x0: usize,
    /// Write cursor.
    pub x: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    pub fn new() -> Self {
        Self::with_alloc_size(1024)
    }

    pub fn with_alloc_size(alloc_size: usize) -> Self {
        Self {
            uint8: vec![0u8; alloc_size.max(1)],
            x0: 0,
            x: 0,
        }
    }

    /// Makes room for `capacity` more bytes at the cursor, at least doubling
    /// the allocation when it has to grow.
    #[inline]
    pub fn ensure_capacity(&mut self, capacity: usize) {
        if self.uint8.len() - self.x < capacity {
            let size = (self.uint8.len() * 2).max(self.x + capacity);
            self.grow(size);
        }
    }

    fn grow(&mut self, size: usize) {
        // Flushed bytes are dropped.
        let pending = self.x - self.x0;
        let mut uint8 = vec![0u8; size];
        uint8[..pending].copy_from_slice(&self.uint8[self.x0..self.x]);
        self.uint8 = uint8;
        self.x0 = 0;
        self.x = pending;
    }

    /// Number of bytes written since the last flush.
    pub fn len(&self) -> usize {
        self.x - self.x0
    }

    pub fn is_empty(&self) -> bool {
        self.x == self.x0
    }

    /// Total size of the backing allocation.
    pub fn capacity(&self) -> usize {
        self.uint8.len()
    }

    /// Bytes written since the last flush, without advancing the flush position.
    pub fn as_slice(&self) -> &[u8] {
        &self.uint8[self.x0..self.x]
    }

    /// Discards everything written since the last flush.
    pub fn reset(&mut self) {
        self.x = self.x0;
    }

    /// Hands out the pending bytes and starts a new run after them.
    pub fn flush(&mut self) -> Vec<u8> {
        let out = self.as_slice().to_vec();
        self.x0 = self.x;
        out
    }

    /// Appends one byte.
    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.ensure_capacity(1);
        self.uint8[self.x] = val;
        self.x += 1;
    }

    #[inline]
    pub fn i8(&mut self, val: i8) {
        self.u8(val as u8);
    }

    big_endian! {
        u16 => u16,
        i16 => i16,
        u32 => u32,
        i32 => i32,
        u64 => u64,
        i64 => i64,
        f32 => f32,
        f64 => f64,
    }

    marker_then! {
        u8u8 => u8,
        u8u16 => u16,
        u8u32 => u32,
        u8u64 => u64,
        u8f64 => f64,
    }

    /// Appends raw bytes.
    #[inline]
    pub fn buf(&mut self, bytes: &[u8]) {
        self.ensure_capacity(bytes.len());
        let end = self.x + bytes.len();
        self.uint8[self.x..end].copy_from_slice(bytes);
        self.x = end;
    }

    /// Appends the UTF-8 bytes of `s` and returns how many were written.
    pub fn utf8(&mut self, s: &str) -> usize {
        self.buf(s.as_bytes());
        s.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_big_endian() {
        let mut w = Writer::new();
        w.u8(0x01);
        w.u16(0x0203);
        w.u32(0x0405_0607);
        w.u64(0x0809_0a0b_0c0d_0e0f);
        assert_eq!(
            w.flush(),
            [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f]
        );
    }

    #[test]
    fn signed_values_are_twos_complement() {
        let mut w = Writer::new();
        w.i8(-1);
        w.i16(-2);
        w.i32(-3);
        w.i64(-4);
        let out = w.flush();
        assert_eq!(&out[..7], &[0xff, 0xff, 0xfe, 0xff, 0xff, 0xff, 0xfd]);
        assert_eq!(i64::from_be_bytes(out[7..].try_into().unwrap()), -4);
    }

    #[test]
    fn floats_use_ieee_bits() {
        let mut w = Writer::new();
        w.f32(1.5);
        w.f64(-0.25);
        let out = w.flush();
        assert_eq!(&out[..4], &[0x3f, 0xc0, 0x00, 0x00]);
        assert_eq!(&out[4..], &(-0.25f64).to_be_bytes());
    }

    #[test]
    fn marker_prefixed_numbers() {
        let mut w = Writer::with_alloc_size(1);
        w.u8u8(0xcc, 0x80);
        w.u8u16(0xcd, 0x0100);
        w.u8u32(0xce, 0x0001_0000);
        w.u8u64(0xcf, 1);
        w.u8f64(0xcb, 1.0);
        assert_eq!(
            w.flush(),
            [
                0xcc, 0x80, 0xcd, 0x01, 0x00, 0xce, 0x00, 0x01, 0x00, 0x00, 0xcf, 0, 0, 0, 0, 0,
                0, 0, 1, 0xcb, 0x3f, 0xf0, 0, 0, 0, 0, 0, 0
            ]
        );
    }

    #[test]
    fn utf8_reports_byte_length() {
        let mut w = Writer::new();
        assert_eq!(w.utf8("naïve"), 6);
        assert_eq!(w.flush(), "naïve".as_bytes());
    }

    #[test]
    fn each_flush_returns_only_new_bytes() {
        let mut w = Writer::new();
        w.buf(&[1, 2]);
        assert_eq!(w.flush(), [1, 2]);
        assert!(w.flush().is_empty());
        w.u8(3);
        assert_eq!(w.flush(), [3]);
    }

    #[test]
    fn growth_at_least_doubles() {
        let mut w = Writer::with_alloc_size(4);
        w.u32(1);
        assert_eq!(w.capacity(), 4);
        w.u8(2);
        assert_eq!(w.capacity(), 8);
        w.buf(&[0u8; 20]);
        assert_eq!(w.capacity(), 25);
        assert_eq!(w.len(), 25);
    }

    #[test]
    fn growth_drops_flushed_prefix() {
        let mut w = Writer::with_alloc_size(2);
        w.u8(0xaa);
        w.flush();
        w.u8(0x01);
        w.buf(&[0x02, 0x03]);
        assert_eq!(w.x0, 0);
        assert_eq!(w.as_slice(), [0x01, 0x02, 0x03]);
    }

    #[test]
    fn reset_rewinds_to_last_flush() {
        let mut w = Writer::new();
        w.u8(0x01);
        w.flush();
        w.u16(0x0203);
        w.reset();
        assert!(w.is_empty());
        w.u8(0x04);
        assert_eq!(w.flush(), [0x04]);
    }
}
