//! `tokio-tungstenite` links.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{Connection, ConnectionId, Handshake, Transport, TransportError};

/// How long a connected socket may take to send its upgrade request.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type Socket = WebSocketStream<TcpStream>;

/// Accepts plain `ws://` players on a TCP listener.
pub struct WebSocketTransport {
    listener: TcpListener,
    handshake_timeout: Duration,
}

impl WebSocketTransport {
    /// Port `0` asks the OS for a free port; read it back with
    /// [`Transport::local_addr`].
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(|source| {
            TransportError::Bind {
                addr: addr.to_string(),
                source,
            }
        })?;
        tracing::info!(addr, "listening for players");
        Ok(Self {
            listener,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        })
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Incoming = PendingWebSocket;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<PendingWebSocket, TransportError> {
        let (tcp, peer) =
            self.listener.accept().await.map_err(TransportError::Accept)?;
        tracing::debug!(%peer, "tcp connection accepted");
        Ok(PendingWebSocket {
            tcp,
            peer,
            timeout: self.handshake_timeout,
        })
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// A TCP socket waiting for its WebSocket upgrade request.
pub struct PendingWebSocket {
    tcp: TcpStream,
    peer: SocketAddr,
    timeout: Duration,
}

impl PendingWebSocket {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Handshake for PendingWebSocket {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn complete(self) -> Result<WebSocketConnection, TransportError> {
        let peer = self.peer;
        let upgrade = tokio_tungstenite::accept_async(self.tcp);
        let socket = match tokio::time::timeout(self.timeout, upgrade).await {
            Ok(Ok(socket)) => socket,
            Ok(Err(e)) => {
                return Err(TransportError::Handshake {
                    peer,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(TransportError::Handshake {
                    peer,
                    reason: format!("no upgrade request within {:?}", self.timeout),
                });
            }
        };

        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, "websocket upgraded");
        Ok(WebSocketConnection::new(id, peer, socket))
    }
}

/// A player's WebSocket, split into halves with separate locks.
///
/// The handler's writer task sends while the read loop is parked in
/// `recv`; one shared lock would deadlock that pairing.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    outbound: Mutex<SplitSink<Socket, Message>>,
    inbound: Mutex<SplitStream<Socket>>,
}

impl WebSocketConnection {
    fn new(id: ConnectionId, peer: SocketAddr, socket: Socket) -> Self {
        let (outbound, inbound) = socket.split();
        Self {
            id,
            peer,
            outbound: Mutex::new(outbound),
            inbound: Mutex::new(inbound),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn write_error(&self, err: tungstenite::Error) -> TransportError {
        match err {
            tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed => TransportError::Closed(self.id),
            other => TransportError::Write {
                conn: self.id,
                reason: other.to_string(),
            },
        }
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, frame: &str) -> Result<(), TransportError> {
        let mut outbound = self.outbound.lock().await;
        outbound
            .send(Message::text(frame.to_owned()))
            .await
            .map_err(|e| self.write_error(e))
    }

    async fn recv(&self) -> Result<Option<String>, TransportError> {
        let mut inbound = self.inbound.lock().await;
        while let Some(next) = inbound.next().await {
            let msg = next.map_err(|e| TransportError::Read {
                conn: self.id,
                reason: e.to_string(),
            })?;
            match msg {
                Message::Text(text) => return Ok(Some(text.as_str().to_owned())),
                // Bad UTF-8 reaches the codec and comes back as a
                // malformed-record error instead of a dropped player.
                Message::Binary(bytes) => {
                    return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut outbound = self.outbound.lock().await;
        match outbound.close().await {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(self.write_error(e)),
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
