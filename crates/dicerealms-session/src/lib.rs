//! Session registry and broadcast fabric for DiceRealms.
//!
//! The registry answers two questions: *how do I reach participant X?*
//! and *what is participant X called?* It hands out participant
//! identifiers, binds each one to an outbound channel, and delivers
//! records point-to-point or to everyone.
//!
//! # How it fits in the stack
//!
//! ```text
//! Turn layer (above)  ← broadcasts announcements, results, next-turn notices
//!     ↕
//! Session layer (this crate)  ← identity, names, outbound channels
//!     ↕
//! Protocol layer (below)  ← ParticipantId, ServerMessage
//! ```
//!
//! Registry operations never suspend. Outbound channels are unbounded
//! `mpsc` senders; a per-connection writer task owns the receiving end and
//! the socket, so a slow or dead client never stalls a broadcast.

mod error;
mod registry;

pub use error::SessionError;
pub use registry::{
    SessionReceiver, SessionRegistry, SessionSender, session_channel,
};
