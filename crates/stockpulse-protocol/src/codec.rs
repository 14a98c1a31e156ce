//! Codec trait and implementations for serializing/deserializing frames.
//!
//! The lifecycle manager only needs "something that turns an [`Envelope`]
//! into bytes and back"; the [`Codec`] trait is that seam. [`JsonCodec`] is
//! the only implementation because browsers speak JSON natively.
//!
//! [`Envelope`]: crate::Envelope

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the life of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do not
    /// match the expected shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use stockpulse_protocol::{Codec, Envelope, JsonCodec, SystemMessage};
///
/// let codec = JsonCodec;
/// let envelope = Envelope::system(1, 5000, SystemMessage::Heartbeat { client_time: 5000 });
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Envelope, Payload, SystemMessage};

    #[test]
    fn test_json_codec_decodes_browser_frame() {
        let codec = JsonCodec;
        let raw = br#"{"payload":{"type":"System","data":{"type":"Heartbeat","client_time":9}}}"#;

        let env: Envelope = codec.decode(raw).expect("should decode");

        assert_eq!(
            env.payload,
            Payload::System(SystemMessage::Heartbeat { client_time: 9 })
        );
    }

    #[test]
    fn test_json_codec_garbage_returns_decode_error() {
        let codec = JsonCodec;
        let result: Result<Envelope, _> = codec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_output_is_utf8() {
        // The transport sends UTF-8 frames as WebSocket text.
        let codec = JsonCodec;
        let bytes = codec
            .encode(&Envelope::system(
                0,
                0,
                SystemMessage::RoomJoined { room: "ü".into() },
            ))
            .unwrap();
        assert!(std::str::from_utf8(&bytes).is_ok());
    }
}
