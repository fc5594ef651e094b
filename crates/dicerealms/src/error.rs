//! Unified error type for the DiceRealms server.

use dicerealms_protocol::ProtocolError;
use dicerealms_session::SessionError;
use dicerealms_transport::TransportError;
use dicerealms_turn::TurnError;
use dicerealms_world::{DiceError, WorldError};

/// Top-level error that wraps every crate-specific error.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum DiceRealmsError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Dice(#[from] DiceError),

    #[error(transparent)]
    Turn(#[from] TurnError),

    /// Reading a world file or similar local I/O.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
