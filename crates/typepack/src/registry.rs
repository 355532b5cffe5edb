//! Extension type registry.
//!
//! Maps an extension type id (0–127) to a predicate that claims values on the
//! encode side, plus the functions that write and read the payload. Each
//! [`crate::Serializer`] owns its own registry; encoders and decoders borrow
//! it, so serializers with different type sets never interfere.
//!
//! Register everything during startup. Registration needs `&mut Registry`, so
//! once the registry is shared by reference it is effectively frozen.

use std::fmt;

use tracing::debug;

use crate::constants::ext;
use crate::decoder::ExtDecoder;
use crate::encoder::Encoder;
use crate::{PackError, Value};

/// Decides whether a binding handles a value.
pub type Predicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;
/// Writes a value's extension payload.
pub type EncodeFn =
    Box<dyn Fn(&Value, &mut Encoder<'_, '_>) -> Result<(), PackError> + Send + Sync>;
/// Rebuilds a value from an extension payload.
pub type DecodeFn = Box<dyn Fn(&mut ExtDecoder<'_, '_>) -> Result<Value, PackError> + Send + Sync>;

/// One registered extension type.
pub struct Binding {
    pub id: u8,
    pub predicate: Predicate,
    pub encode: EncodeFn,
    pub decode: DecodeFn,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding").field("id", &self.id).finish()
    }
}

const SLOTS: usize = ext::MAX_ID as usize + 1;

pub struct Registry {
    slots: Vec<Option<Binding>>,
    /// Ids in first-registration order; the encoder scans predicates in this order.
    order: Vec<u8>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("ids", &self.order).finish()
    }
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            slots: (0..SLOTS).map(|_| None).collect(),
            order: Vec::new(),
        }
    }

    /// Binds extension type `id`.
    ///
    /// Re-registering an id replaces the previous binding in place; it keeps
    /// its original position in the predicate scan order.
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
        if id > ext::MAX_ID {
            return Err(PackError::Registration { id });
        }
        let binding = Binding {
            id,
            predicate: Box::new(predicate),
            encode: Box::new(encode),
            decode: Box::new(decode),
        };
        let slot = &mut self.slots[id as usize];
        if slot.is_some() {
            debug!(id, "replacing extension binding");
        } else {
            self.order.push(id);
        }
        *slot = Some(binding);
        Ok(())
    }

    /// Looks up the binding for a decoded type id.
    pub fn get(&self, id: u8) -> Option<&Binding> {
        self.slots.get(id as usize).and_then(Option::as_ref)
    }

    pub fn contains(&self, id: u8) -> bool {
        self.get(id).is_some()
    }

    /// First binding, in registration order, whose predicate accepts `value`.
    ///
    /// Linear in the number of bindings.
    pub fn find(&self, value: &Value) -> Option<&Binding> {
        self.order
            .iter()
            .filter_map(|&id| self.get(id))
            .find(|binding| (binding.predicate)(value))
    }

    /// Registered ids in scan order.
    pub fn ids(&self) -> &[u8] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
