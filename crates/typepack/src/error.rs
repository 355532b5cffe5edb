//! Codec error type.

use thiserror::Error;
use typepack_buffers::BufferError;

/// Error type for typepack encoding, decoding and type registration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PackError {
    /// The input is a valid prefix of a larger value. Supply more bytes and
    /// retry from the same offset.
    #[error("incomplete input")]
    IncompleteInput,
    /// The input is corrupt. No amount of additional bytes repairs it.
    #[error("malformed input: {0}")]
    MalformedInput(Malformed),
    #[error("unsupported value: {0}")]
    UnsupportedValue(Unsupported),
    #[error("extension type id {id} is outside 0..=127")]
    Registration { id: u8 },
    #[error("unknown extension type {type_id}")]
    UnknownExtensionType { type_id: u8 },
}

impl PackError {
    /// True when the caller should wait for more bytes.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, PackError::IncompleteInput)
    }

    /// True when the input or value can never succeed, however many bytes follow.
    pub fn is_fatal(&self) -> bool {
        !self.is_incomplete()
    }

    pub(crate) fn payload(type_id: u8, reason: impl Into<String>) -> Self {
        PackError::MalformedInput(Malformed::InvalidPayload {
            type_id,
            reason: reason.into(),
        })
    }

    /// Shifts any byte offset in the error forward by `base`.
    pub(crate) fn offset_by(self, base: usize) -> Self {
        match self {
            PackError::MalformedInput(err) => PackError::MalformedInput(err.offset_by(base)),
            other => other,
        }
    }
}

/// Reasons an input is rejected as corrupt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Malformed {
    #[error("unknown marker 0x{marker:02x} at byte {offset}")]
    UnknownMarker { marker: u8, offset: usize },
    #[error("map32 at byte {offset} is too large to decode")]
    MapTooLarge { offset: usize },
    #[error("invalid UTF-8 in string at byte {offset}")]
    InvalidUtf8 { offset: usize },
    #[error("non-string map key at byte {offset}")]
    NonStringKey { offset: usize },
    #[error("nesting exceeds depth limit {limit}")]
    TooDeep { limit: usize },
    #[error("invalid payload for extension type {type_id}: {reason}")]
    InvalidPayload { type_id: u8, reason: String },
}

/// Reasons a value cannot be encoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Unsupported {
    #[error("no extension registered for type `{type_name}`")]
    Type { type_name: String },
    #[error("nesting exceeds depth limit {limit}")]
    TooDeep { limit: usize },
    #[error("length {len} does not fit a 32-bit header")]
    TooLong { len: usize },
}

impl Malformed {
    fn offset_by(self, base: usize) -> Self {
        match self {
            Malformed::UnknownMarker { marker, offset } => Malformed::UnknownMarker {
                marker,
                offset: offset + base,
            },
            Malformed::MapTooLarge { offset } => Malformed::MapTooLarge {
                offset: offset + base,
            },
            Malformed::InvalidUtf8 { offset } => Malformed::InvalidUtf8 {
                offset: offset + base,
            },
            Malformed::NonStringKey { offset } => Malformed::NonStringKey {
                offset: offset + base,
            },
            other => other,
        }
    }
}

impl From<Malformed> for PackError {
    fn from(err: Malformed) -> Self {
        PackError::MalformedInput(err)
    }
}

impl From<Unsupported> for PackError {
    fn from(err: Unsupported) -> Self {
        PackError::UnsupportedValue(err)
    }
}

/// Maps a reader failure at byte `offset` into the codec taxonomy.
pub(crate) fn from_buffer(err: BufferError, offset: usize) -> PackError {
    match err {
        BufferError::EndOfBuffer => PackError::IncompleteInput,
        BufferError::InvalidUtf8 => Malformed::InvalidUtf8 { offset }.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_is_the_only_recoverable_error() {
        assert!(PackError::IncompleteInput.is_incomplete());
        assert!(!PackError::IncompleteInput.is_fatal());
        let fatal = [
            PackError::from(Malformed::MapTooLarge { offset: 0 }),
            PackError::from(Unsupported::TooDeep { limit: 1 }),
            PackError::Registration { id: 200 },
            PackError::UnknownExtensionType { type_id: 7 },
        ];
        for err in fatal {
            assert!(err.is_fatal(), "{err}");
        }
    }

    #[test]
    fn buffer_errors_map_by_kind() {
        assert_eq!(
            from_buffer(BufferError::EndOfBuffer, 3),
            PackError::IncompleteInput
        );
        assert_eq!(
            from_buffer(BufferError::InvalidUtf8, 3),
            PackError::MalformedInput(Malformed::InvalidUtf8 { offset: 3 })
        );
    }

    #[test]
    fn offsets_shift_only_where_present() {
        let shifted = PackError::from(Malformed::NonStringKey { offset: 3 }).offset_by(10);
        assert_eq!(shifted, Malformed::NonStringKey { offset: 13 }.into());
        let depth = PackError::from(Malformed::TooDeep { limit: 4 });
        assert_eq!(depth.clone().offset_by(10), depth);
        assert_eq!(
            PackError::IncompleteInput.offset_by(10),
            PackError::IncompleteInput
        );
    }

    #[test]
    fn messages_name_the_problem() {
        let err = PackError::from(Malformed::UnknownMarker {
            marker: 0xc1,
            offset: 4,
        });
        assert_eq!(err.to_string(), "malformed input: unknown marker 0xc1 at byte 4");
        let err = PackError::from(Unsupported::Type {
            type_name: "Widget".into(),
        });
        assert_eq!(
            err.to_string(),
            "unsupported value: no extension registered for type `Widget`"
        );
    }
}
