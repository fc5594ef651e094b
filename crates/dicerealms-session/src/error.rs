//! Error types for the session layer.

use dicerealms_protocol::{ErrorKind, ParticipantId};

/// Errors that can occur while managing registry entries.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No entry exists for the participant (never registered, or already
    /// unregistered).
    #[error("session not found for {0}")]
    NotFound(ParticipantId),

    /// The participant already chose a display name. Names are assigned
    /// once and never change.
    #[error("{0} already joined as {1}")]
    NameAlreadySet(ParticipantId, String),
}

impl SessionError {
    /// The kind reported to the client that triggered this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::UnknownParticipant,
            Self::NameAlreadySet(..) => ErrorKind::MalformedMessage,
        }
    }
}
