//! Codec trait and implementations for serializing/deserializing frames.
//!
//! The dispatcher never touches `serde_json` directly: it asks a
//! [`Codec`] to turn bytes into an [`Envelope`](crate::Envelope) and back.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Turns frames into values and back.
///
/// One instance is shared by every worker task for the lifetime of the
/// server.
pub trait Codec: Send + Sync + 'static {
    /// # Errors
    /// [`ProtocolError::Encode`] when `value` cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// # Errors
    /// [`ProtocolError::Decode`] for malformed input or input of the
    /// wrong shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// One JSON document per frame, via `serde_json`.
///
/// ```rust
/// use skirmish_protocol::{Codec, Envelope, JsonCodec, Kind, Operation};
///
/// let bytes = br#"{"type":1,"operation":2,"request_id":7}"#;
/// let envelope: Envelope = JsonCodec.decode(bytes).unwrap();
/// assert_eq!(envelope.kind, Kind::Request);
/// assert_eq!(envelope.operation, Some(Operation::ListRooms));
/// assert_eq!(envelope.request_id, Some(7));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Envelope, Kind};

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<Envelope, _> = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_produces_integer_kind() {
        let env = Envelope::bare(Kind::Response);
        let bytes = JsonCodec.encode(&env).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["type"], 2);
    }
}
