//! `Serializer`: registry, encoder and decoder behind one handle.

use tracing::debug;
use typepack_buffers::Writer;

use crate::builtins::register_builtins;
use crate::config::SerializerConfig;
use crate::decoder::{Decoder, ExtDecoder, Progress};
use crate::encoder::Encoder;
use crate::registry::Registry;
use crate::stream::StreamDecoder;
use crate::{PackError, Value};

/// Owns a [`Registry`] and encodes/decodes through it.
///
/// Register custom types right after construction. Once the serializer is
/// shared (`&Serializer`, `Arc<Serializer>`) its registry cannot change.
#[derive(Debug)]
pub struct Serializer {
    registry: Registry,
    config: SerializerConfig,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    /// A serializer with the default config and all built-in host bindings.
    pub fn new() -> Self {
        Self::with_config(SerializerConfig::default())
    }

    pub fn with_config(config: SerializerConfig) -> Self {
        let mut registry = Registry::new();
        if config.builtins {
            // Built-in ids are constants inside 0..=127, so this cannot fail.
            let registered = register_builtins(&mut registry);
            debug_assert!(registered.is_ok(), "built-in registration failed: {registered:?}");
            debug!(count = registry.len(), "registered built-in extensions");
        }
        Serializer { registry, config }
    }

    /// A serializer with an empty registry; only native values are supported.
    pub fn bare() -> Self {
        Self::with_config(SerializerConfig::default().with_builtins(false))
    }

    /// Binds extension type `id`. See [`Registry::register`].
    pub fn register<P, E, D>(
        &mut self,
        id: u8,
        predicate: P,
        encode: E,
        decode: D,
    ) -> Result<(), PackError>
    where
        P: Fn(&Value) -> bool + Send + Sync + 'static,
        E: Fn(&Value, &mut Encoder<'_, '_>) -> Result<(), PackError> + Send + Sync + 'static,
        D: Fn(&mut ExtDecoder<'_, '_>) -> Result<Value, PackError> + Send + Sync + 'static,
    {
        self.registry.register(id, predicate, encode, decode)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, PackError> {
        let mut writer = Writer::with_alloc_size(self.config.initial_capacity);
        self.encode_into(value, &mut writer)?;
        Ok(writer.flush())
    }

    /// Appends the encoding of `value` to a caller-supplied writer.
    ///
    /// On error the writer may hold a partial encoding after its previous
    /// contents; call [`Writer::reset`] to discard it.
    pub fn encode_into(&self, value: &Value, writer: &mut Writer) -> Result<(), PackError> {
        Encoder::new(&self.registry, writer, self.config.max_depth).write_value(value)
    }

    /// Decodes the first value in `bytes`. Trailing bytes are ignored.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value, PackError> {
        self.decoder().decode(bytes)
    }

    /// Resumable decode of one value at `offset`. See [`Decoder::try_decode`].
    pub fn try_decode(&self, bytes: &[u8], offset: usize) -> Result<Progress, PackError> {
        self.decoder().try_decode(bytes, offset)
    }

    /// A chunk-fed decoder sharing this serializer's registry.
    pub fn stream(&self) -> StreamDecoder<'_> {
        StreamDecoder::new(self)
    }

    fn decoder(&self) -> Decoder<'_> {
        Decoder::new(&self.registry, self.config.max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Long, RegExp};
    use crate::{Malformed, Unsupported};

    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    fn with_point(serializer: &mut Serializer) {
        serializer
            .register(
                7,
                |v| matches!(v, Value::Host(h) if h.is::<Point>()),
                |v, enc| {
                    let Value::Host(h) = v else {
                        return Ok(());
                    };
                    let Some(p) = h.downcast_ref::<Point>() else {
                        return Ok(());
                    };
                    enc.writer().i32(p.x);
                    enc.writer().i32(p.y);
                    Ok(())
                },
                |ext| {
                    let x = ext.reader().try_i32().map_err(|_| ext.invalid("short point"))?;
                    let y = ext.reader().try_i32().map_err(|_| ext.invalid("short point"))?;
                    Ok(Value::from_host(Point { x, y }))
                },
            )
            .unwrap();
    }

    #[test]
    fn builtins_are_registered_by_default() {
        let serializer = Serializer::new();
        assert_eq!(serializer.registry().len(), 7);
        let bare = Serializer::bare();
        assert!(bare.registry().is_empty());
        assert_eq!(
            bare.encode(&Value::Long(Long::Signed(1))),
            Err(PackError::UnsupportedValue(Unsupported::Type {
                type_name: "Long".into()
            }))
        );
    }

    #[test]
    fn builtin_registration_always_succeeds() {
        let mut registry = Registry::new();
        assert_eq!(register_builtins(&mut registry), Ok(()));
        let serializer = Serializer::with_config(SerializerConfig::default());
        assert_eq!(serializer.registry().ids(), registry.ids());
        assert_eq!(serializer.registry().ids(), &[119, 120, 121, 122, 123, 124, 125]);
    }

    #[test]
    fn custom_host_type_roundtrip() {
        let mut serializer = Serializer::new();
        with_point(&mut serializer);
        let value = Value::Array(vec![
            Value::from_host(Point { x: 3, y: -4 }),
            Value::RegExp(RegExp::new("a+", "g")),
        ]);
        let bytes = serializer.encode(&value).unwrap();
        assert_eq!(&bytes[..3], &[0x92, 0xd7, 7]);
        assert_eq!(serializer.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn registries_do_not_leak_between_serializers() {
        let mut with = Serializer::new();
        with_point(&mut with);
        let without = Serializer::new();

        let bytes = with.encode(&Value::from_host(Point { x: 1, y: 2 })).unwrap();
        assert_eq!(
            without.decode(&bytes),
            Err(PackError::UnknownExtensionType { type_id: 7 })
        );
    }

    #[test]
    fn register_out_of_range() {
        let mut serializer = Serializer::bare();
        let err = serializer
            .register(200, |_| false, |_, _| Ok(()), |_| Ok(Value::Null))
            .unwrap_err();
        assert_eq!(err, PackError::Registration { id: 200 });
    }

    #[test]
    fn encode_into_appends() {
        let serializer = Serializer::new();
        let mut writer = Writer::new();
        serializer.encode_into(&Value::Integer(1), &mut writer).unwrap();
        serializer.encode_into(&Value::from("a"), &mut writer).unwrap();
        assert_eq!(writer.flush(), [0x01, 0xa1, b'a']);
    }

    #[test]
    fn max_depth_applies_both_ways() {
        let serializer = Serializer::with_config(SerializerConfig::default().with_max_depth(2));
        let deep = Value::Array(vec![Value::Array(vec![Value::Array(vec![])])]);
        assert_eq!(
            serializer.encode(&deep),
            Err(PackError::UnsupportedValue(Unsupported::TooDeep { limit: 2 }))
        );
        assert_eq!(
            serializer.decode(&[0x91, 0x91, 0x90]),
            Err(PackError::MalformedInput(Malformed::TooDeep { limit: 2 }))
        );
        assert!(serializer.decode(&[0x91, 0x90]).is_ok());
    }

    #[test]
    fn try_decode_reports_consumed() {
        let serializer = Serializer::new();
        let bytes = [0x01, 0xcc, 0x80, 0xcc];
        assert_eq!(
            serializer.try_decode(&bytes, 1),
            Ok(Progress::Complete {
                value: Value::Integer(128),
                consumed: 2
            })
        );
        assert_eq!(serializer.try_decode(&bytes, 3), Ok(Progress::Incomplete));
    }
}
