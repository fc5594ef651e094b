//! Wire protocol for DiceRealms.
//!
//! Every frame on the wire is a single JSON record carrying a `type`
//! discriminator. This crate defines:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`ParticipantId`],
//!   [`ActionDetails`]): the records clients and server exchange.
//! - **Error taxonomy** ([`ErrorKind`]): the closed set of failure kinds
//!   that can be reported to a client.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how records are turned
//!   into text frames and back.
//!
//! ```text
//! Transport (text frames) → Protocol (records) → Session / Turn layers
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ActionDetails, ActionStatus, ClientMessage, ErrorKind, ParticipantId,
    ServerMessage,
};
