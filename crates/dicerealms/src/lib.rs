//! # DiceRealms
//!
//! A turn-based multiplayer server for dice rolling and light text
//! adventure. Clients connect over WebSocket, take turns in strict
//! round-robin order, and every table sees the same sequence of
//! announcements, results and turn changes.
//!
//! The meta-crate wires the layers together:
//!
//! ```text
//! transport → protocol → session → turn pipeline → world
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dicerealms::prelude::*;
//!
//! # async fn run() -> Result<(), DiceRealmsError> {
//! let server = DiceRealmsServer::builder()
//!     .bind("0.0.0.0:8765")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::DiceRealmsError;
pub use server::{DiceRealmsServer, DiceRealmsServerBuilder, ServerConfig};

pub mod prelude {
    pub use crate::{
        DiceRealmsError, DiceRealmsServer, DiceRealmsServerBuilder,
        ServerConfig,
    };
    pub use dicerealms_protocol::{
        ActionDetails, ClientMessage, ErrorKind, ParticipantId, ServerMessage,
    };
    pub use dicerealms_turn::PipelineConfig;
    pub use dicerealms_world::{
        DiceRoller, RandomRoller, ScriptedRoller, World,
    };
}
