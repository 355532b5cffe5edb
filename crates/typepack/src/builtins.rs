//! Built-in extension bindings for the host types in [`crate::host`].
//!
//! | id  | type      | payload                                              |
//! |-----|-----------|------------------------------------------------------|
//! | 119 | `Long`    | flag byte (1 = unsigned), 8-byte big-endian bits     |
//! | 120 | `BigInt`  | decimal digits as raw UTF-8                          |
//! | 121 | `RegExp`  | source string, flags string                          |
//! | 122 | `Set`     | size, then each element                              |
//! | 123 | `Map`     | size, then key and value of each entry               |
//! | 124 | `Date`    | 8-byte big-endian signed millisecond count           |
//! | 125 | `Error`   | kind id byte, name, stack or nil, message, field count, fields |
//!
//! Id 126 is reserved. Everything after a fixed-width prefix is written with
//! the regular encoder, so nested values may themselves be extensions.

use chrono::{TimeZone, Utc};

use crate::constants::ext;
use crate::decoder::ExtDecoder;
use crate::encoder::Encoder;
use crate::host::{ErrorKind, ErrorValue, Long, RegExp};
use crate::registry::Registry;
use crate::{PackError, Unsupported, Value};

/// Registers all built-in host bindings into `registry`.
pub fn register_builtins(registry: &mut Registry) -> Result<(), PackError> {
    registry.register(
        ext::LONG,
        |v| matches!(v, Value::Long(_)),
        encode_long,
        decode_long,
    )?;
    registry.register(
        ext::BIG_INT,
        |v| matches!(v, Value::BigInt(_)),
        encode_big_int,
        decode_big_int,
    )?;
    registry.register(
        ext::REG_EXP,
        |v| matches!(v, Value::RegExp(_)),
        encode_reg_exp,
        decode_reg_exp,
    )?;
    registry.register(
        ext::SET,
        |v| matches!(v, Value::Set(_)),
        encode_set,
        decode_set,
    )?;
    registry.register(
        ext::MAP,
        |v| matches!(v, Value::Map(_)),
        encode_map,
        decode_map,
    )?;
    registry.register(
        ext::DATE,
        |v| matches!(v, Value::Date(_)),
        encode_date,
        decode_date,
    )?;
    registry.register(
        ext::ERROR,
        |v| matches!(v, Value::Error(_)),
        encode_error,
        decode_error,
    )?;
    Ok(())
}

/// Raised when a binding is handed a value its predicate did not claim.
fn mismatch(value: &Value) -> PackError {
    Unsupported::Type {
        type_name: value.type_name().to_owned(),
    }
    .into()
}

fn encode_long(value: &Value, enc: &mut Encoder<'_, '_>) -> Result<(), PackError> {
    let Value::Long(long) = value else {
        return Err(mismatch(value));
    };
    let writer = enc.writer();
    writer.u8(u8::from(long.is_unsigned()));
    writer.u64(long.to_bits());
    Ok(())
}

fn decode_long(ext: &mut ExtDecoder<'_, '_>) -> Result<Value, PackError> {
    let unsigned = match ext.read_u8()? {
        0 => false,
        1 => true,
        flag => return Err(ext.invalid(format!("bad signedness flag {flag}"))),
    };
    let bits = ext.read_u64()?;
    Ok(Value::Long(Long::from_bits(bits, unsigned)))
}

fn encode_big_int(value: &Value, enc: &mut Encoder<'_, '_>) -> Result<(), PackError> {
    let Value::BigInt(n) = value else {
        return Err(mismatch(value));
    };
    enc.writer().utf8(n.as_str());
    Ok(())
}

fn decode_big_int(ext: &mut ExtDecoder<'_, '_>) -> Result<Value, PackError> {
    let digits = ext.read_rest_utf8()?;
    let n = digits.parse().map_err(|err| ext.invalid(format!("{err}")))?;
    Ok(Value::BigInt(n))
}

fn encode_reg_exp(value: &Value, enc: &mut Encoder<'_, '_>) -> Result<(), PackError> {
    let Value::RegExp(re) = value else {
        return Err(mismatch(value));
    };
    enc.write_str(&re.source)?;
    enc.write_str(&re.flags)
}

fn decode_reg_exp(ext: &mut ExtDecoder<'_, '_>) -> Result<Value, PackError> {
    let source = ext.read_string()?;
    let flags = ext.read_string()?;
    Ok(Value::RegExp(RegExp { source, flags }))
}

fn encode_set(value: &Value, enc: &mut Encoder<'_, '_>) -> Result<(), PackError> {
    let Value::Set(items) = value else {
        return Err(mismatch(value));
    };
    write_size(enc, items.len())?;
    items.iter().try_for_each(|item| enc.write_value(item))
}

fn decode_set(ext: &mut ExtDecoder<'_, '_>) -> Result<Value, PackError> {
    let size = ext.read_len()?;
    let mut items = Vec::with_capacity(size.min(ext.remaining()));
    for _ in 0..size {
        items.push(ext.read_value()?);
    }
    Ok(Value::Set(items))
}

fn encode_map(value: &Value, enc: &mut Encoder<'_, '_>) -> Result<(), PackError> {
    let Value::Map(entries) = value else {
        return Err(mismatch(value));
    };
    write_size(enc, entries.len())?;
    entries.iter().try_for_each(|(key, val)| {
        enc.write_value(key)?;
        enc.write_value(val)
    })
}

fn decode_map(ext: &mut ExtDecoder<'_, '_>) -> Result<Value, PackError> {
    let size = ext.read_len()?;
    let mut entries = Vec::with_capacity(size.min(ext.remaining() / 2));
    for _ in 0..size {
        let key = ext.read_value()?;
        let val = ext.read_value()?;
        entries.push((key, val));
    }
    Ok(Value::Map(entries))
}

fn encode_date(value: &Value, enc: &mut Encoder<'_, '_>) -> Result<(), PackError> {
    let Value::Date(date) = value else {
        return Err(mismatch(value));
    };
    enc.writer().i64(date.timestamp_millis());
    Ok(())
}

fn decode_date(ext: &mut ExtDecoder<'_, '_>) -> Result<Value, PackError> {
    let millis = ext.read_i64()?;
    let date = Utc
        .timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| ext.invalid(format!("timestamp {millis}ms out of range")))?;
    Ok(Value::Date(date))
}

fn encode_error(value: &Value, enc: &mut Encoder<'_, '_>) -> Result<(), PackError> {
    let Value::Error(err) = value else {
        return Err(mismatch(value));
    };
    enc.writer().u8(err.kind.id());
    enc.write_str(&err.name)?;
    match &err.stack {
        Some(stack) => enc.write_str(stack)?,
        None => enc.write_null(),
    }
    enc.write_str(&err.message)?;
    write_size(enc, err.fields.len())?;
    err.fields.iter().try_for_each(|(key, val)| {
        enc.write_str(key)?;
        enc.write_value(val)
    })
}

fn decode_error(ext: &mut ExtDecoder<'_, '_>) -> Result<Value, PackError> {
    let kind = ErrorKind::from_id(ext.read_u8()?);
    let name = ext.read_string()?;
    let stack = match ext.read_value()? {
        Value::Str(stack) => Some(stack),
        Value::Null | Value::Undefined => None,
        other => {
            return Err(ext.invalid(format!("expected stack, found {}", other.type_name())));
        }
    };
    let message = ext.read_string()?;
    let count = ext.read_len()?;
    let mut fields = Vec::with_capacity(count.min(ext.remaining() / 2));
    for _ in 0..count {
        let key = ext.read_string()?;
        let val = ext.read_value()?;
        fields.push((key, val));
    }
    Ok(Value::from(ErrorValue {
        kind,
        name,
        message,
        stack,
        fields,
    }))
}

fn write_size(enc: &mut Encoder<'_, '_>, size: usize) -> Result<(), PackError> {
    let size = i64::try_from(size).map_err(|_| Unsupported::TooLong { len: size })?;
    enc.write_integer(size);
    Ok(())
}
