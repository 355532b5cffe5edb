//! `Encoder`: writes [`Value`]s in the smallest MessagePack form.
//!
//! Native values are written directly. Everything else is handed to the first
//! registry binding whose predicate accepts it; the binding writes its payload
//! into a fresh sub-buffer, and the encoder then frames that payload with an
//! extension header chosen by its exact length.

use tracing::warn;
use typepack_buffers::Writer;

use crate::constants::{ext, marker};
use crate::int_form::classify_int;
use crate::registry::Registry;
use crate::{PackError, Unsupported, Value};

/// Initial allocation for an extension payload sub-buffer.
pub const EXT_ALLOC_SIZE: usize = 64;

pub struct Encoder<'r, 'w> {
    registry: &'r Registry,
    writer: &'w mut Writer,
    depth: usize,
    max_depth: usize,
}

impl<'r, 'w> Encoder<'r, 'w> {
    /// Creates an encoder appending to `writer`.
    ///
    /// Containers and extensions nested deeper than `max_depth` are rejected
    /// with [`Unsupported::TooDeep`].
    pub fn new(registry: &'r Registry, writer: &'w mut Writer, max_depth: usize) -> Self {
        Self {
            registry,
            writer,
            depth: 0,
            max_depth,
        }
    }

    /// The output buffer, for extension payloads that write raw bytes.
    pub fn writer(&mut self) -> &mut Writer {
        self.writer
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn write_value(&mut self, value: &Value) -> Result<(), PackError> {
        match value {
            Value::Undefined => self.write_undefined(),
            Value::Null => self.write_null(),
            Value::Bool(b) => self.write_boolean(*b),
            Value::Integer(n) => self.write_integer(*n),
            Value::Float(f) => self.write_float(*f),
            Value::Str(s) => self.write_str(s)?,
            Value::Bytes(b) => self.write_bin(b)?,
            Value::Array(items) => self.nested(|enc| {
                enc.write_arr_hdr(items.len())?;
                items.iter().try_for_each(|item| enc.write_value(item))
            })?,
            Value::Object(pairs) => self.nested(|enc| {
                enc.write_obj_hdr(pairs.len())?;
                pairs.iter().try_for_each(|(key, val)| {
                    enc.write_str(key)?;
                    enc.write_value(val)
                })
            })?,
            other => self.write_registered(other)?,
        }
        Ok(())
    }

    /// Runs `f` one nesting level deeper.
    fn nested<F>(&mut self, f: F) -> Result<(), PackError>
    where
        F: FnOnce(&mut Self) -> Result<(), PackError>,
    {
        if self.depth >= self.max_depth {
            warn!(limit = self.max_depth, "encode nesting limit reached");
            return Err(Unsupported::TooDeep {
                limit: self.max_depth,
            }
            .into());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn write_registered(&mut self, value: &Value) -> Result<(), PackError> {
        let registry = self.registry;
        let binding = registry.find(value).ok_or_else(|| Unsupported::Type {
            type_name: value.type_name().to_owned(),
        })?;
        let mut payload = Writer::with_alloc_size(EXT_ALLOC_SIZE);
        self.nested(|enc| {
            let mut sub = Encoder {
                registry,
                writer: &mut payload,
                depth: enc.depth,
                max_depth: enc.max_depth,
            };
            (binding.encode)(value, &mut sub)
        })?;
        self.write_ext(binding.id, payload.as_slice())
    }

    /// The "no value" sentinel: type-0 fixext1 with a zero payload byte.
    pub fn write_undefined(&mut self) {
        self.writer.buf(&[marker::FIXEXT1, ext::UNDEFINED, 0x00]);
    }

    pub fn write_null(&mut self) {
        self.writer.u8(marker::NIL);
    }

    pub fn write_boolean(&mut self, b: bool) {
        self.writer.u8(if b { marker::TRUE } else { marker::FALSE });
    }

    pub fn write_integer(&mut self, n: i64) {
        classify_int(n).write(self.writer);
    }

    pub fn write_float(&mut self, f: f64) {
        self.writer.u8f64(marker::FLOAT64, f);
    }

    pub fn write_str_hdr(&mut self, length: usize) -> Result<(), PackError> {
        if length < 0x20 {
            self.writer.u8(marker::FIXSTR | length as u8);
        } else if length <= 0xff {
            self.writer.u8u8(marker::STR8, length as u8);
        } else if length <= 0xffff {
            self.writer.u8u16(marker::STR16, length as u16);
        } else {
            self.writer.u8u32(marker::STR32, u32_len(length)?);
        }
        Ok(())
    }

    pub fn write_str(&mut self, s: &str) -> Result<(), PackError> {
        self.write_str_hdr(s.len())?;
        self.writer.utf8(s);
        Ok(())
    }

    pub fn write_bin_hdr(&mut self, length: usize) -> Result<(), PackError> {
        if length <= 0xff {
            self.writer.u8u8(marker::BIN8, length as u8);
        } else if length <= 0xffff {
            self.writer.u8u16(marker::BIN16, length as u16);
        } else {
            self.writer.u8u32(marker::BIN32, u32_len(length)?);
        }
        Ok(())
    }

    pub fn write_bin(&mut self, buf: &[u8]) -> Result<(), PackError> {
        self.write_bin_hdr(buf.len())?;
        self.writer.buf(buf);
        Ok(())
    }

    pub fn write_arr_hdr(&mut self, length: usize) -> Result<(), PackError> {
        if length < 0x10 {
            self.writer.u8(marker::FIXARRAY | length as u8);
        } else if length <= 0xffff {
            self.writer.u8u16(marker::ARRAY16, length as u16);
        } else {
            self.writer.u8u32(marker::ARRAY32, u32_len(length)?);
        }
        Ok(())
    }

    /// Generic objects stop at map16; the decoder refuses map32 outright.
    pub fn write_obj_hdr(&mut self, length: usize) -> Result<(), PackError> {
        if length < 0x10 {
            self.writer.u8(marker::FIXMAP | length as u8);
        } else if length <= 0xffff {
            self.writer.u8u16(marker::MAP16, length as u16);
        } else {
            return Err(Unsupported::TooLong { len: length }.into());
        }
        Ok(())
    }

    /// Writes an extension header for a payload of `length` bytes.
    pub fn write_ext_hdr(&mut self, type_id: u8, length: usize) -> Result<(), PackError> {
        match length {
            1 => self.writer.u8u8(marker::FIXEXT1, type_id),
            2 => self.writer.u8u8(marker::FIXEXT2, type_id),
            4 => self.writer.u8u8(marker::FIXEXT4, type_id),
            8 => self.writer.u8u8(marker::FIXEXT8, type_id),
            16 => self.writer.u8u8(marker::FIXEXT16, type_id),
            _ if length <= 0xff => {
                self.writer.u8u8(marker::EXT8, length as u8);
                self.writer.u8(type_id);
            }
            _ if length <= 0xffff => {
                self.writer.u8u16(marker::EXT16, length as u16);
                self.writer.u8(type_id);
            }
            _ => {
                self.writer.u8u32(marker::EXT32, u32_len(length)?);
                self.writer.u8(type_id);
            }
        }
        Ok(())
    }

    /// Writes a complete extension: header, then payload.
    pub fn write_ext(&mut self, type_id: u8, payload: &[u8]) -> Result<(), PackError> {
        self.write_ext_hdr(type_id, payload.len())?;
        self.writer.buf(payload);
        Ok(())
    }
}

fn u32_len(length: usize) -> Result<u32, PackError> {
    u32::try_from(length).map_err(|_| Unsupported::TooLong { len: length }.into())
}
