//! Frame plumbing between DiceRealms players and the server.
//!
//! A player's link is a duplex stream of UTF-8 text frames, one JSON
//! record per frame. [`Transport`] hands out freshly connected sockets,
//! [`Handshake`] turns one into a link, and [`Connection`] moves frames
//! across it. The listener never waits on a handshake, so the caller runs
//! [`Handshake::complete`] in the per-connection task.
//!
//! The `websocket` feature (on by default) provides the
//! `tokio-tungstenite` implementation.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    DEFAULT_HANDSHAKE_TIMEOUT, PendingWebSocket, WebSocketConnection,
    WebSocketTransport,
};

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LINK: AtomicU64 = AtomicU64::new(1);

/// Tags a link for log correlation before a participant exists for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Allocates a process-unique id. Never returns zero.
    pub fn next() -> Self {
        Self(NEXT_LINK.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Listener side: yields one [`Handshake`] per player that dials in.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Incoming: Handshake<Connection = Self::Connection, Error = Self::Error>;
    type Error: std::error::Error + Send + Sync;

    /// Resolves as soon as a socket connects. No bytes have been read yet.
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;

    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// A connected socket whose protocol handshake has not run yet.
pub trait Handshake: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Runs the handshake, failing if the peer stalls past the
    /// transport's handshake timeout.
    async fn complete(self) -> Result<Self::Connection, Self::Error>;
}

/// One player's link.
///
/// `send` and `recv` take `&self` so a writer task and the read loop can
/// share the link through an `Arc`.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    async fn send(&self, frame: &str) -> Result<(), Self::Error>;

    /// Next text frame, or `Ok(None)` once the player has hung up.
    async fn recv(&self) -> Result<Option<String>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}
