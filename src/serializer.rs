//! Serialization layer. Defaults to JSON via serde_json.
//!
//! Implement [`Serializer`] if you need a different on-disk layout.

use crate::error::{Error, Result};
use crate::persist::Store;

/// Converts a [`Store`] to/from bytes for persistence.
pub trait Serializer: Send + Sync {
    /// Encode the whole store.
    fn serialize(&self, store: &Store) -> Result<Vec<u8>>;

    /// Decode bytes back into a store.
    fn deserialize(&self, bytes: &[u8]) -> Result<Store>;
}

/// JSON serializer, pretty (2-space indent) or compact.
#[derive(Debug, Clone)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Compact JSON (single line, no extra whitespace).
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    /// Pretty-printed JSON with 2-space indentation. This is the default.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Default for JsonSerializer {
    fn default() -> Self {
        Self::pretty()
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, store: &Store) -> Result<Vec<u8>> {
        // serde_json's pretty printer indents with two spaces.
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(store)
        } else {
            serde_json::to_vec(store)
        };
        bytes.map_err(|e| Error::Serialize(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Store> {
        serde_json::from_slice(bytes).map_err(Error::from)
    }
}
