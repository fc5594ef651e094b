use std::net::SocketAddr;

use crate::ConnectionId;

/// Failures moving frames between a player and the server.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The TCP socket connected but never became a WebSocket.
    #[error("handshake with {peer} failed: {reason}")]
    Handshake { peer: SocketAddr, reason: String },

    #[error("{0} is closed")]
    Closed(ConnectionId),

    #[error("write to {conn} failed: {reason}")]
    Write { conn: ConnectionId, reason: String },

    #[error("read from {conn} failed: {reason}")]
    Read { conn: ConnectionId, reason: String },
}
