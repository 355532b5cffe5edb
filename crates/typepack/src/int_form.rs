//! Integer wire-form selection.
//!
//! [`classify_int`] is the one place the magnitude thresholds live. The
//! encoder asks it for the smallest form and then calls [`IntForm::write`].

use typepack_buffers::Writer;

use crate::constants::{marker, MAX_SAFE_INTEGER, MIN_SAFE_INTEGER};

/// The wire form chosen for an integer, carrying the narrowed value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntForm {
    /// `0x00..=0x7f`
    PositiveFixint(u8),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    /// `0xe0..=0xff`, i.e. -32..=-1
    NegativeFixint(i8),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    /// Beyond the safe integer range: written as a double, precision loss
    /// accepted.
    Float64(f64),
}

/// Picks the smallest wire form for `n`.
pub fn classify_int(n: i64) -> IntForm {
    if n >= 0 {
        if n < 0x80 {
            IntForm::PositiveFixint(n as u8)
        } else if n < 0x100 {
            IntForm::Uint8(n as u8)
        } else if n < 0x1_0000 {
            IntForm::Uint16(n as u16)
        } else if n <= 0xffff_ffff {
            IntForm::Uint32(n as u32)
        } else if n <= MAX_SAFE_INTEGER {
            IntForm::Uint64(n as u64)
        } else {
            IntForm::Float64(n as f64)
        }
    } else if n >= -0x20 {
        IntForm::NegativeFixint(n as i8)
    } else if n >= -0x80 {
        IntForm::Int8(n as i8)
    } else if n >= -0x8000 {
        IntForm::Int16(n as i16)
    } else if n >= i64::from(i32::MIN) {
        IntForm::Int32(n as i32)
    } else if n >= MIN_SAFE_INTEGER {
        IntForm::Int64(n)
    } else {
        IntForm::Float64(n as f64)
    }
}

impl IntForm {
    /// Encoded size in bytes, marker included.
    pub fn encoded_len(self) -> usize {
        match self {
            IntForm::PositiveFixint(_) | IntForm::NegativeFixint(_) => 1,
            IntForm::Uint8(_) | IntForm::Int8(_) => 2,
            IntForm::Uint16(_) | IntForm::Int16(_) => 3,
            IntForm::Uint32(_) | IntForm::Int32(_) => 5,
            IntForm::Uint64(_) | IntForm::Int64(_) | IntForm::Float64(_) => 9,
        }
    }

    pub fn write(self, writer: &mut Writer) {
        match self {
            IntForm::PositiveFixint(n) => writer.u8(n),
            IntForm::Uint8(n) => writer.u8u8(marker::UINT8, n),
            IntForm::Uint16(n) => writer.u8u16(marker::UINT16, n),
            IntForm::Uint32(n) => writer.u8u32(marker::UINT32, n),
            IntForm::Uint64(n) => writer.u8u64(marker::UINT64, n),
            IntForm::NegativeFixint(n) => writer.i8(n),
            IntForm::Int8(n) => writer.u8u8(marker::INT8, n as u8),
            IntForm::Int16(n) => writer.u8u16(marker::INT16, n as u16),
            IntForm::Int32(n) => writer.u8u32(marker::INT32, n as u32),
            IntForm::Int64(n) => writer.u8u64(marker::INT64, n as u64),
            IntForm::Float64(f) => writer.u8f64(marker::FLOAT64, f),
        }
    }
}
