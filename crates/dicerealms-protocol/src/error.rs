//! Error types for the protocol layer.

use crate::ErrorKind;

/// Errors that can occur while encoding or decoding records.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing a record into a text frame failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The frame is not a record we understand: broken JSON, a missing
    /// `type`, an unknown `type`, or fields of the wrong shape.
    #[cfg(feature = "json")]
    #[error("malformed message: {0}")]
    Decode(serde_json::Error),

    /// The record parsed but breaks a protocol rule (e.g. an empty name).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    /// Every protocol failure is reported to the client as a malformed
    /// message.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedMessage
    }
}
