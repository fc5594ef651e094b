//! Codec trait and implementations for text frames.
//!
//! The transport moves UTF-8 text; the rest of the server works with typed
//! records. A [`Codec`] sits between the two. [`JsonCodec`] is the only
//! implementation today, and it is what browser and terminal clients speak.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts records to text frames and back.
///
/// `Send + Sync + 'static` because one codec value is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Parses one text frame back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the frame is malformed or
    /// doesn't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        frame: &str,
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use dicerealms_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let msg: ClientMessage =
///     codec.decode(r#"{"type":"action","action":"roll","args":["2d6"]}"#).unwrap();
/// assert_eq!(
///     msg,
///     ClientMessage::Action { action: "roll".into(), args: vec!["2d6".into()] },
/// );
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        frame: &str,
    ) -> Result<T, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }
}
