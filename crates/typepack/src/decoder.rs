//! `Decoder`: resumable MessagePack decoder.
//!
//! Decoding never reads past the end of the input. Running out of bytes is
//! reported as [`PackError::IncompleteInput`], which [`Decoder::try_decode`]
//! turns into [`Progress::Incomplete`] so a streaming transport can wait for
//! more data and retry from the same offset. Anything that more bytes cannot
//! repair (an unknown marker, a refused map32, bad UTF-8) is a hard error.

use tracing::{trace, warn};
use typepack_buffers::{BufferError, Reader};

use crate::constants::{ext, marker};
use crate::error::from_buffer;
use crate::registry::Registry;
use crate::{Malformed, PackError, Value};

/// Outcome of one resumable decode attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// A full value was decoded from `consumed` bytes (always > 0).
    Complete { value: Value, consumed: usize },
    /// The bytes are a valid prefix of a larger value; nothing was consumed.
    Incomplete,
}

impl Progress {
    pub fn consumed(&self) -> usize {
        match self {
            Progress::Complete { consumed, .. } => *consumed,
            Progress::Incomplete => 0,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Progress::Complete { value, .. } => Some(value),
            Progress::Incomplete => None,
        }
    }
}

pub struct Decoder<'r> {
    registry: &'r Registry,
    max_depth: usize,
}

#[inline]
fn eof(_: BufferError) -> PackError {
    PackError::IncompleteInput
}

impl<'r> Decoder<'r> {
    /// Creates a decoder that rehydrates extensions through `registry`.
    ///
    /// Containers and extensions nested deeper than `max_depth` are rejected
    /// with [`Malformed::TooDeep`].
    pub fn new(registry: &'r Registry, max_depth: usize) -> Self {
        Self {
            registry,
            max_depth,
        }
    }

    /// Decodes the first value in `input`. Trailing bytes are ignored.
    pub fn decode(&self, input: &[u8]) -> Result<Value, PackError> {
        let mut reader = Reader::new(input);
        self.read_any(&mut reader, 0)
    }

    /// Attempts to decode one value starting at `offset`.
    ///
    /// Returns [`Progress::Incomplete`] when `input[offset..]` is a valid but
    /// truncated encoding. Partially decoded containers are never returned.
    pub fn try_decode(&self, input: &[u8], offset: usize) -> Result<Progress, PackError> {
        let mut reader = Reader::at(input, offset);
        match self.read_any(&mut reader, 0) {
            Ok(value) => Ok(Progress::Complete {
                value,
                consumed: reader.x - offset,
            }),
            Err(PackError::IncompleteInput) => {
                trace!(offset, available = input.len().saturating_sub(offset), "incomplete value");
                Ok(Progress::Incomplete)
            }
            Err(err) => Err(err),
        }
    }

    fn descend(&self, depth: usize) -> Result<usize, PackError> {
        if depth >= self.max_depth {
            warn!(limit = self.max_depth, "decode nesting limit reached");
            return Err(Malformed::TooDeep {
                limit: self.max_depth,
            }
            .into());
        }
        Ok(depth + 1)
    }

    /// Reads one value. Arrays and objects are assembled on a heap stack, so
    /// only extensions recurse.
    fn read_any(&self, r: &mut Reader<'_>, depth: usize) -> Result<Value, PackError> {
        let mut open: Vec<Open> = Vec::new();
        loop {
            if let Some(Open::Object { key, .. }) = open.last_mut() {
                *key = Some(self.read_key(r)?);
            }
            let level = depth + open.len();
            let mut value = match self.read_head(r)? {
                Head::Value(value) => value,
                Head::Ext(size) => self.read_ext(r, size, level)?,
                Head::Array(0) => {
                    self.descend(level)?;
                    Value::Array(Vec::new())
                }
                Head::Object(0) => {
                    self.descend(level)?;
                    Value::Object(Vec::new())
                }
                Head::Array(len) => {
                    self.descend(level)?;
                    // Every element takes at least one byte.
                    if len > r.size() {
                        return Err(PackError::IncompleteInput);
                    }
                    open.push(Open::Array {
                        items: Vec::with_capacity(len),
                        len,
                    });
                    continue;
                }
                Head::Object(len) => {
                    self.descend(level)?;
                    // Every pair takes at least two bytes.
                    if len.saturating_mul(2) > r.size() {
                        return Err(PackError::IncompleteInput);
                    }
                    open.push(Open::Object {
                        pairs: Vec::with_capacity(len),
                        len,
                        key: None,
                    });
                    continue;
                }
            };
            // Hand the value to its parent, closing every container it fills.
            loop {
                let Some(mut parent) = open.pop() else {
                    return Ok(value);
                };
                parent.push(value);
                if !parent.is_full() {
                    open.push(parent);
                    break;
                }
                value = parent.close();
            }
        }
    }

    /// Reads a marker and whatever fixed-size header follows it.
    #[inline(never)]
    fn read_head(&self, r: &mut Reader<'_>) -> Result<Head, PackError> {
        let offset = r.x;
        let byte = r.try_u8().map_err(eof)?;

        // positive fixint, fixmap, fixarray
        if byte <= 0x9f {
            if byte <= marker::POSITIVE_FIXINT_MAX {
                return Ok(Head::Value(Value::Integer(i64::from(byte))));
            }
            if byte < marker::FIXARRAY {
                return Ok(Head::Object(usize::from(byte & 0x0f)));
            }
            return Ok(Head::Array(usize::from(byte & 0x0f)));
        }
        // fixstr
        if byte <= 0xbf {
            return self.read_str(r, usize::from(byte & 0x1f)).map(Head::from);
        }
        // negative fixint
        if byte >= marker::NEGATIVE_FIXINT {
            return Ok(Head::Value(Value::Integer(i64::from(byte as i8))));
        }

        let head: Head = match byte {
            marker::NIL => Value::Null.into(),
            marker::FALSE => Value::Bool(false).into(),
            marker::TRUE => Value::Bool(true).into(),
            marker::BIN8 => {
                let n = usize::from(r.try_u8().map_err(eof)?);
                self.read_bin(r, n)?.into()
            }
            marker::BIN16 => {
                let n = usize::from(r.try_u16().map_err(eof)?);
                self.read_bin(r, n)?.into()
            }
            marker::BIN32 => {
                let n = r.try_u32().map_err(eof)? as usize;
                self.read_bin(r, n)?.into()
            }
            marker::EXT8 => Head::Ext(usize::from(r.try_u8().map_err(eof)?)),
            marker::EXT16 => Head::Ext(usize::from(r.try_u16().map_err(eof)?)),
            marker::EXT32 => Head::Ext(r.try_u32().map_err(eof)? as usize),
            marker::FLOAT32 => Value::Float(f64::from(r.try_f32().map_err(eof)?)).into(),
            marker::FLOAT64 => Value::Float(r.try_f64().map_err(eof)?).into(),
            marker::UINT8 => Value::Integer(i64::from(r.try_u8().map_err(eof)?)).into(),
            marker::UINT16 => Value::Integer(i64::from(r.try_u16().map_err(eof)?)).into(),
            marker::UINT32 => Value::Integer(i64::from(r.try_u32().map_err(eof)?)).into(),
            marker::UINT64 => {
                let n = r.try_u64().map_err(eof)?;
                // Above i64::MAX only a float approximation remains.
                let value = match i64::try_from(n) {
                    Ok(n) => Value::Integer(n),
                    Err(_) => Value::Float(n as f64),
                };
                value.into()
            }
            marker::INT8 => Value::Integer(i64::from(r.try_i8().map_err(eof)?)).into(),
            marker::INT16 => Value::Integer(i64::from(r.try_i16().map_err(eof)?)).into(),
            marker::INT32 => Value::Integer(i64::from(r.try_i32().map_err(eof)?)).into(),
            marker::INT64 => Value::Integer(r.try_i64().map_err(eof)?).into(),
            marker::FIXEXT1 => Head::Ext(1),
            marker::FIXEXT2 => Head::Ext(2),
            marker::FIXEXT4 => Head::Ext(4),
            marker::FIXEXT8 => Head::Ext(8),
            marker::FIXEXT16 => Head::Ext(16),
            marker::STR8 => {
                let n = usize::from(r.try_u8().map_err(eof)?);
                self.read_str(r, n)?.into()
            }
            marker::STR16 => {
                let n = usize::from(r.try_u16().map_err(eof)?);
                self.read_str(r, n)?.into()
            }
            marker::STR32 => {
                let n = r.try_u32().map_err(eof)? as usize;
                self.read_str(r, n)?.into()
            }
            marker::ARRAY16 => Head::Array(usize::from(r.try_u16().map_err(eof)?)),
            marker::ARRAY32 => Head::Array(r.try_u32().map_err(eof)? as usize),
            marker::MAP16 => Head::Object(usize::from(r.try_u16().map_err(eof)?)),
            marker::MAP32 => {
                warn!(offset, "refusing map32");
                return Err(Malformed::MapTooLarge { offset }.into());
            }
            _ => {
                warn!(offset, marker = byte, "unknown marker");
                return Err(Malformed::UnknownMarker {
                    marker: byte,
                    offset,
                }
                .into());
            }
        };
        Ok(head)
    }

    fn read_str(&self, r: &mut Reader<'_>, size: usize) -> Result<String, PackError> {
        let offset = r.x;
        r.try_utf8(size)
            .map(str::to_owned)
            .map_err(|err| from_buffer(err, offset))
    }

    fn read_bin(&self, r: &mut Reader<'_>, size: usize) -> Result<Value, PackError> {
        let bin = r.try_buf(size).map_err(eof)?;
        Ok(Value::Bytes(bin.to_vec()))
    }

    fn read_key(&self, r: &mut Reader<'_>) -> Result<String, PackError> {
        let offset = r.x;
        let byte = r.try_u8().map_err(eof)?;
        let size = match byte {
            0xa0..=0xbf => usize::from(byte & 0x1f),
            marker::STR8 => usize::from(r.try_u8().map_err(eof)?),
            marker::STR16 => usize::from(r.try_u16().map_err(eof)?),
            marker::STR32 => r.try_u32().map_err(eof)? as usize,
            _ => return Err(Malformed::NonStringKey { offset }.into()),
        };
        self.read_str(r, size)
    }

    #[inline(never)]
    fn read_ext(&self, r: &mut Reader<'_>, size: usize, depth: usize) -> Result<Value, PackError> {
        let type_id = r.try_u8().map_err(eof)?;
        let payload = r.try_cut(size).map_err(eof)?;
        if type_id == ext::UNDEFINED && payload.uint8 == [0] {
            return Ok(Value::Undefined);
        }
        let binding = self
            .registry
            .get(type_id)
            .ok_or(PackError::UnknownExtensionType { type_id })?;
        let depth = self.descend(depth)?;
        let mut ext = ExtDecoder {
            decoder: self,
            reader: payload,
            type_id,
            depth,
        };
        match (binding.decode)(&mut ext) {
            // The whole payload was available, so running short inside it is corruption.
            Err(PackError::IncompleteInput) => Err(PackError::payload(type_id, "truncated payload")),
            result => result,
        }
    }
}

/// A marker with its header read, before any child values.
enum Head {
    Value(Value),
    Array(usize),
    Object(usize),
    Ext(usize),
}

impl From<Value> for Head {
    fn from(value: Value) -> Self {
        Head::Value(value)
    }
}

impl From<String> for Head {
    fn from(s: String) -> Self {
        Head::Value(Value::Str(s))
    }
}

/// A container still collecting its children.
enum Open {
    Array {
        items: Vec<Value>,
        len: usize,
    },
    Object {
        pairs: Vec<(String, Value)>,
        len: usize,
        key: Option<String>,
    },
}

impl Open {
    fn push(&mut self, value: Value) {
        match self {
            Open::Array { items, .. } => items.push(value),
            Open::Object { pairs, key, .. } => pairs.push((key.take().unwrap_or_default(), value)),
        }
    }

    fn is_full(&self) -> bool {
        match self {
            Open::Array { items, len } => items.len() == *len,
            Open::Object { pairs, len, .. } => pairs.len() == *len,
        }
    }

    fn close(self) -> Value {
        match self {
            Open::Array { items, .. } => Value::Array(items),
            Open::Object { pairs, .. } => Value::Object(pairs),
        }
    }
}

/// Payload reader handed to a registry decode function.
///
/// Reads are confined to the extension's own payload bytes.
pub struct ExtDecoder<'d, 'a> {
    decoder: &'d Decoder<'d>,
    reader: Reader<'a>,
    type_id: u8,
    depth: usize,
}

impl<'d, 'a> ExtDecoder<'d, 'a> {
    pub fn type_id(&self) -> u8 {
        self.type_id
    }

    /// The complete payload, independent of how much has been read.
    pub fn payload(&self) -> &'a [u8] {
        self.reader.uint8
    }

    pub fn remaining(&self) -> usize {
        self.reader.size()
    }

    /// Raw access for fixed-layout payloads.
    pub fn reader(&mut self) -> &mut Reader<'a> {
        &mut self.reader
    }

    /// Decodes the next nested value from the payload.
    pub fn read_value(&mut self) -> Result<Value, PackError> {
        self.decoder.read_any(&mut self.reader, self.depth)
    }

    /// Decodes the next nested value, which must be a string.
    pub fn read_string(&mut self) -> Result<String, PackError> {
        match self.read_value()? {
            Value::Str(s) => Ok(s),
            other => Err(self.invalid(format!("expected string, found {}", other.type_name()))),
        }
    }

    /// Decodes the next nested value, which must be a non-negative integer.
    pub fn read_len(&mut self) -> Result<usize, PackError> {
        match self.read_value()? {
            Value::Integer(n) if n >= 0 => usize::try_from(n).map_err(|_| self.invalid("length overflow")),
            other => Err(self.invalid(format!("expected length, found {other:?}"))),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, PackError> {
        self.reader.try_u8().map_err(eof)
    }

    pub fn read_u64(&mut self) -> Result<u64, PackError> {
        self.reader.try_u64().map_err(eof)
    }

    pub fn read_i64(&mut self) -> Result<i64, PackError> {
        self.reader.try_i64().map_err(eof)
    }

    /// Reads the rest of the payload as UTF-8.
    pub fn read_rest_utf8(&mut self) -> Result<&'a str, PackError> {
        let offset = self.reader.x;
        let size = self.reader.size();
        self.reader
            .try_utf8(size)
            .map_err(|_| self.invalid(format!("invalid UTF-8 at payload byte {offset}")))
    }

    /// An [`Malformed::InvalidPayload`] error for this extension type.
    pub fn invalid(&self, reason: impl Into<String>) -> PackError {
        PackError::payload(self.type_id, reason)
    }
}
