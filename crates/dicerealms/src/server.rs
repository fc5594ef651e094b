//! `DiceRealmsServer` builder and accept loop.
//!
//! This is the entry point for running a DiceRealms table. It owns the
//! shared game state (ledger, registry, world, pipeline) and hands an
//! `Arc` of it to every connection task.

use std::sync::Arc;
use std::time::Duration;

use dicerealms_protocol::{Codec, JsonCodec};
use dicerealms_session::SessionRegistry;
use dicerealms_transport::{
    DEFAULT_HANDSHAKE_TIMEOUT, Handshake, Transport, WebSocketTransport,
};
use dicerealms_turn::{ActionPipeline, PipelineConfig, TurnLedger};
use dicerealms_world::{DiceRoller, RandomRoller, World};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::DiceRealmsError;
use crate::handler::handle_connection;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// A connection that sends nothing for this long is closed.
    pub idle_timeout: Duration,
    /// A socket that has not finished its WebSocket upgrade by then is
    /// dropped.
    pub handshake_timeout: Duration,
    pub pipeline: PipelineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8765".to_string(),
            idle_timeout: Duration::from_secs(300),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            pipeline: PipelineConfig::default(),
        }
    }
}

/// Shared server state passed to each connection handler task.
///
/// Ledger, registry and world each have their own lock; the pipeline holds
/// clones of the same three `Arc`s.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) sessions: Arc<Mutex<SessionRegistry>>,
    pub(crate) ledger: Arc<Mutex<TurnLedger>>,
    pub(crate) world: Arc<Mutex<World>>,
    pub(crate) pipeline: Arc<ActionPipeline>,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a DiceRealms server.
///
/// # Example
///
/// ```rust,ignore
/// let server = DiceRealmsServer::builder()
///     .bind("0.0.0.0:8765")
///     .action_delay(Duration::from_millis(500))
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct DiceRealmsServerBuilder {
    config: ServerConfig,
    world: Option<World>,
    dice: Option<Box<dyn DiceRoller>>,
}

impl DiceRealmsServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            world: None,
            dice: None,
        }
    }

    /// Replaces every setting at once.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the pause between an action's announcement and its result.
    pub fn action_delay(mut self, delay: Duration) -> Self {
        self.config.pipeline.action_delay = delay;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Uses this world instead of the starter map.
    pub fn world(mut self, world: World) -> Self {
        self.world = Some(world);
        self
    }

    /// Uses this dice source instead of OS-seeded randomness.
    pub fn dice(mut self, dice: impl DiceRoller) -> Self {
        self.dice = Some(Box::new(dice));
        self
    }

    /// Binds the listener and assembles the shared state.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<DiceRealmsServer, DiceRealmsError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr)
            .await?
            .with_handshake_timeout(self.config.handshake_timeout);

        let sessions = Arc::new(Mutex::new(SessionRegistry::new()));
        let ledger = Arc::new(Mutex::new(TurnLedger::new()));
        let world = Arc::new(Mutex::new(self.world.unwrap_or_default()));
        let dice = self
            .dice
            .unwrap_or_else(|| Box::new(RandomRoller::new()));
        let pipeline = Arc::new(ActionPipeline::new(
            Arc::clone(&ledger),
            Arc::clone(&sessions),
            Arc::clone(&world),
            dice,
            &self.config.pipeline,
        ));

        let state = Arc::new(ServerState {
            sessions,
            ledger,
            world,
            pipeline,
            codec: JsonCodec,
            config: self.config,
        });

        Ok(DiceRealmsServer { transport, state })
    }
}

impl Default for DiceRealmsServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A bound DiceRealms server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct DiceRealmsServer {
    transport: WebSocketTransport,
    state: Arc<ServerState<JsonCodec>>,
}

impl DiceRealmsServer {
    pub fn builder() -> DiceRealmsServerBuilder {
        DiceRealmsServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Runs the accept loop.
    ///
    /// Spawns a task per accepted socket that upgrades it and then runs
    /// the handler, so a peer that never finishes its handshake holds up
    /// only its own task. Runs until the process is terminated; a failed
    /// accept is logged and the loop continues.
    pub async fn run(mut self) -> Result<(), DiceRealmsError> {
        tracing::info!(
            addr = %self.state.config.bind_addr,
            delay_ms = self.state.config.pipeline.action_delay.as_millis() as u64,
            "DiceRealms server running"
        );

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let peer = pending.peer_addr();
                        let conn = match pending.complete().await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::debug!(%peer, error = %e, "handshake failed");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
