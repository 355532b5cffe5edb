//! MessagePack-compatible codec with a pluggable extension registry.
//!
//! Native values use the smallest MessagePack form. Host types (timestamps,
//! maps with arbitrary keys, sets, regular expressions, big integers, 64-bit
//! integers and exception objects) travel as private extension types 119–125,
//! and applications can bind their own types to any other id in 0..=127.
//!
//! ```
//! use typepack::{decode, encode, Value};
//!
//! let value = Value::Array(vec![Value::Integer(1), Value::from("two")]);
//! let bytes = encode(&value).unwrap();
//! assert_eq!(bytes, [0x92, 0x01, 0xa3, b't', b'w', b'o']);
//! assert_eq!(decode(&bytes).unwrap(), value);
//! ```
//!
//! The decoder is resumable: [`Serializer::try_decode`] reports
//! [`Progress::Incomplete`] when the input is a valid prefix, so transports
//! can wait for more bytes instead of failing. [`StreamDecoder`] wraps that
//! loop for chunked input.

mod builtins;
mod config;
pub mod constants;
mod decoder;
mod encoder;
mod error;
pub mod host;
mod int_form;
mod registry;
mod serializer;
mod stream;
mod value;

use once_cell::sync::Lazy;

pub use builtins::register_builtins;
pub use config::{SerializerConfig, DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_DEPTH};
pub use decoder::{Decoder, ExtDecoder, Progress};
pub use encoder::{Encoder, EXT_ALLOC_SIZE};
pub use error::{Malformed, PackError, Unsupported};
pub use host::{BigInt, ErrorKind, ErrorValue, HostObject, HostRef, Long, RegExp};
pub use int_form::{classify_int, IntForm};
pub use registry::{Binding, DecodeFn, EncodeFn, Predicate, Registry};
pub use serializer::Serializer;
pub use stream::StreamDecoder;
pub use typepack_buffers::{Reader, Writer};
pub use value::Value;

static DEFAULT: Lazy<Serializer> = Lazy::new(Serializer::new);

/// Encodes with a shared default [`Serializer`] (built-ins only).
pub fn encode(value: &Value) -> Result<Vec<u8>, PackError> {
    DEFAULT.encode(value)
}

/// Decodes with a shared default [`Serializer`] (built-ins only).
pub fn decode(bytes: &[u8]) -> Result<Value, PackError> {
    DEFAULT.decode(bytes)
}
