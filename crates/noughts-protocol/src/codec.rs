//! Codecs: turning envelopes into frames and back.
//!
//! The protocol layer does not care how a frame is serialized, only that
//! something implements [`Codec`]. [`JsonCodec`] is the default and the
//! only format the room server speaks today.

use serde::{de::DeserializeOwned, Serialize};

use crate::{Envelope, Payload, ProtocolError};

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task on the server and by the client's link task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes a frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do
    /// not match `T`.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;

    /// Wraps `payload` in an envelope and encodes it.
    fn encode_envelope(
        &self,
        seq: u64,
        timestamp: u64,
        payload: Payload,
    ) -> Result<Vec<u8>, ProtocolError> {
        self.encode(&Envelope {
            seq,
            timestamp,
            payload,
        })
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// Frames are readable in browser devtools and server logs, which is worth
/// more than compactness for a turn-based game.
///
/// ```rust
/// use noughts_protocol::{ClientEvent, Codec, Envelope, JsonCodec, Payload};
///
/// let codec = JsonCodec;
/// let bytes = codec
///     .encode_envelope(1, 0, Payload::Client(ClientEvent::RequestRoomId { request_id: 7 }))
///     .unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded.seq, 1);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
