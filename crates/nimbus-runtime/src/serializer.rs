//! Payload serialization

use nimbus_core::Properties;
use serde_json::Value;

use crate::error::{DataStoreError, Result};

/// Converts payloads to and from wire bytes
pub trait Serializer: Send + Sync {
    fn serialize(&self, properties: &Properties) -> Result<Vec<u8>>;

    /// Empty input deserializes to an empty map
    fn deserialize(&self, bytes: &[u8]) -> Result<Properties>;

    /// Content type of the serialized form
    fn content_type(&self) -> &str {
        "application/json"
    }
}

/// JSON serializer
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, properties: &Properties) -> Result<Vec<u8>> {
        serde_json::to_vec(properties).map_err(|e| DataStoreError::Serialization(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Properties> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Properties::new());
        }
        match serde_json::from_slice(bytes) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(DataStoreError::Serialization(format!(
                "Expected a JSON object, found {}",
                json_kind(&other)
            ))),
            Err(e) => Err(DataStoreError::Serialization(e.to_string())),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
