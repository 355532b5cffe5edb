//! Byte buffers used by the typepack codec.
//!
//! [`Writer`] is the encode side: a growable buffer with a single write
//! cursor. [`Reader`] is the decode side: a cursor over a borrowed slice whose
//! every read is checked against the end of the input.
//!
//! All multi-byte values are big-endian.

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

use thiserror::Error;

/// Error returned by bounds-checked [`Reader`] operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    #[error("read past end of buffer")]
    EndOfBuffer,
    #[error("invalid UTF-8")]
    InvalidUtf8,
}
