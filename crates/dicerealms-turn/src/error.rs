//! Error types for the turn layer.

use dicerealms_protocol::{ErrorKind, ParticipantId};
use dicerealms_world::{DiceError, WorldError};

/// Reasons an action is refused before anything happens.
///
/// These are private: they go back to the requester only, and neither the
/// ledger nor the world is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    #[error("{0} is not in the game")]
    UnknownParticipant(ParticipantId),

    /// `current` is whoever holds the turn, if anyone.
    #[error("not your turn")]
    NotYourTurn { current: Option<ParticipantId> },

    #[error("another action is still being resolved")]
    ActionInProgress,
}

impl TurnError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownParticipant(_) => ErrorKind::UnknownParticipant,
            Self::NotYourTurn { .. } => ErrorKind::NotYourTurn,
            Self::ActionInProgress => ErrorKind::ActionInProgress,
        }
    }
}

/// Reasons an accepted action fails while executing.
///
/// These are public: the failure is broadcast as the action's result and
/// the turn is still consumed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("{0}")]
    InvalidExpression(String),

    #[error("{0}")]
    NoExit(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The actor disconnected while their action was pending.
    #[error("{0} is no longer in the world.")]
    Departed(String),
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidExpression(_) => ErrorKind::InvalidExpression,
            Self::NoExit(_) => ErrorKind::NoExit,
            Self::UnknownAction(_) => ErrorKind::UnknownAction,
            Self::Departed(_) => ErrorKind::UnknownParticipant,
        }
    }
}

impl From<DiceError> for ActionError {
    fn from(err: DiceError) -> Self {
        Self::InvalidExpression(err.to_string())
    }
}

impl From<WorldError> for ActionError {
    fn from(err: WorldError) -> Self {
        match err {
            WorldError::UnknownParticipant(id) => Self::Departed(id.to_string()),
            other => Self::NoExit(other.to_string()),
        }
    }
}
