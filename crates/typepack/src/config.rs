//! Serializer configuration.

use serde::{Deserialize, Serialize};

/// Default maximum nesting depth for encode and decode.
pub const DEFAULT_MAX_DEPTH: usize = 256;
/// Default initial allocation of a top-level encode buffer.
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// Settings fixed at [`crate::Serializer`] construction.
///
/// Missing fields fall back to their defaults when deserialized, so hosts can
/// embed a partial `[typepack]` table in their own config files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerConfig {
    /// Deepest structural nesting accepted by the encoder and decoder.
    pub max_depth: usize,
    /// Initial capacity of the writer used by `Serializer::encode`.
    pub initial_capacity: usize,
    /// Register the built-in host bindings (ids 119–125).
    pub builtins: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        SerializerConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            builtins: true,
        }
    }
}

impl SerializerConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_builtins(mut self, builtins: bool) -> Self {
        self.builtins = builtins;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SerializerConfig::default();
        assert_eq!(config.max_depth, 256);
        assert_eq!(config.initial_capacity, 1024);
        assert!(config.builtins);
    }

    #[test]
    fn builder_setters() {
        let config = SerializerConfig::default()
            .with_max_depth(4)
            .with_initial_capacity(16)
            .with_builtins(false);
        assert_eq!(
            config,
            SerializerConfig {
                max_depth: 4,
                initial_capacity: 16,
                builtins: false,
            }
        );
    }

    #[test]
    fn partial_config_from_json() {
        let config: SerializerConfig =
            serde_json::from_value(serde_json::json!({ "max_depth": 64 })).unwrap();
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.initial_capacity, DEFAULT_INITIAL_CAPACITY);
        assert!(config.builtins);

        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(back["builtins"], serde_json::json!(true));
    }
}
