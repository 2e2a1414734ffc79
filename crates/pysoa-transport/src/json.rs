//! A [`Serializer`] implementation over plain JSON (spec §4.2, §9).
//!
//! The only concrete serializer this crate ships; MessagePack or any other
//! wire format is an external collaborator's responsibility (spec §1
//! Non-goals), but a JSON implementation is needed for the core's own tests
//! and for anyone wiring the client/server up without a production broker.

use crate::traits::{Serializer, SerializerError};
use pysoa_core::JsonObject;

/// Encodes and decodes [`JsonObject`] values as UTF-8 JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    /// Build a new JSON serializer. Stateless; cheap to construct per call.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Serializer for JsonSerializer {
    fn mime_type(&self) -> &str {
        "application/json"
    }

    fn encode(&self, value: &JsonObject) -> Result<Vec<u8>, SerializerError> {
        serde_json::to_vec(value).map_err(|e| SerializerError::Encode {
            reason: e.to_string(),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<JsonObject, SerializerError> {
        serde_json::from_slice(bytes).map_err(|e| SerializerError::Decode {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trip_preserves_value() {
        let serializer = JsonSerializer::new();
        let mut obj = JsonObject::new();
        obj.insert("hello".to_string(), json!("world"));
        obj.insert("count".to_string(), json!(3));

        let encoded = serializer.encode(&obj).unwrap();
        let decoded = serializer.decode(&encoded).unwrap();
        assert_eq!(obj, decoded);
    }

    #[test]
    fn mime_type_is_application_json() {
        assert_eq!(JsonSerializer::new().mime_type(), "application/json");
    }

    #[test]
    fn decoding_garbage_is_a_decode_error() {
        let serializer = JsonSerializer::new();
        let err = serializer.decode(b"not json").unwrap_err();
        assert!(matches!(err, SerializerError::Decode { .. }));
    }
}
