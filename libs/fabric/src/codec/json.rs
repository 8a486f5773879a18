use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::error::{Error, Result};

/// JSON codec, the default serializer of Moleculer nodes
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| Error::Codec(e.to_string()))
    }

    fn decode<T: for<'de> Deserialize<'de>>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| Error::MalformedEnvelope(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn rejects_non_json() {
        let result: Result<Value> = JsonCodec.decode(b"\x00\x01not json");
        assert!(matches!(result, Err(Error::MalformedEnvelope(_))));
    }

    #[test]
    fn encodes_compact_objects() {
        let bytes = JsonCodec.encode(&json!({"ver": "4"})).unwrap();
        assert_eq!(bytes, br#"{"ver":"4"}"#);
    }
}
