//! Error types for the world and the dice evaluator.

use dicerealms_protocol::ParticipantId;

/// Errors raised by [`World`](crate::World) queries and mutations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The participant has not been placed in the world.
    #[error("{0} is not in the world")]
    UnknownParticipant(ParticipantId),

    /// No room with this id exists.
    #[error("room not found: {0}")]
    RoomNotFound(String),

    /// A room with this id was already added.
    #[error("room {0} already exists")]
    DuplicateRoom(String),

    /// The room has no exit in that direction.
    #[error("No exit {direction} from {room}.")]
    NoExit { room: String, direction: String },

    /// The exit exists but is locked.
    #[error("The way {direction} is locked.")]
    ExitLocked { direction: String },

    /// Two-way connections need a known opposite direction.
    #[error("no opposite direction for '{0}'")]
    NoOppositeDirection(String),

    /// A world document could not be parsed.
    #[error("invalid world document: {0}")]
    Document(#[from] serde_json::Error),
}

/// Errors raised by the dice evaluator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiceError {
    /// The expression is not `<count>d<sides>[+|-<modifier>]`, or its
    /// numbers are out of range.
    #[error("invalid dice expression {expression:?}: {reason}")]
    InvalidExpression {
        expression: String,
        reason: &'static str,
    },
}
