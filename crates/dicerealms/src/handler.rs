//! Per-connection handler: registration, message routing, cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register a participant, bind a writer task, seat them in the turn
//!      order and the world, send `welcome`
//!   2. Loop: receive frames → decode → route by record type
//!   3. On close, error or idle timeout: the drop guard unregisters the
//!      participant, repairs the turn order and tells the table

use std::sync::Arc;

use dicerealms_protocol::{
    ClientMessage, Codec, ErrorKind, ParticipantId, ServerMessage,
};
use dicerealms_session::{SessionReceiver, session_channel};
use dicerealms_transport::{Connection, WebSocketConnection};
use dicerealms_turn::{ActionRequest, TurnError};

use crate::DiceRealmsError;
use crate::server::ServerState;

const WELCOME: &str =
    "Welcome to DiceRealms! Send a 'connect' message to join the game.";

/// Drop guard that removes a participant when the handler exits.
///
/// Cleanup happens even if the handler panics. `Drop` is synchronous, so
/// the async part runs in a spawned task.
struct DisconnectGuard<C: Codec> {
    participant: ParticipantId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for DisconnectGuard<C> {
    fn drop(&mut self) {
        let participant = self.participant;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            disconnect(&state, participant).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), DiceRealmsError>
where
    C: Codec + Clone,
{
    let conn_id = conn.id();
    let conn = Arc::new(conn);
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    // --- Step 1: Register ---
    let (tx, rx) = session_channel();
    let participant = {
        let mut sessions = state.sessions.lock().await;
        let id = sessions.register();
        sessions.bind(id, tx)?;
        sessions.send(
            id,
            ServerMessage::Welcome {
                player_id: id,
                message: WELCOME.to_string(),
            },
        );
        id
    };
    let _guard = DisconnectGuard {
        participant,
        state: Arc::clone(&state),
    };
    tokio::spawn(write_loop(Arc::clone(&conn), rx, state.codec.clone()));

    state.world.lock().await.add_participant(participant)?;
    state.ledger.lock().await.join(participant);
    tracing::info!(%conn_id, %participant, "participant connected");

    // --- Step 2: Message loop ---
    loop {
        let frame = match tokio::time::timeout(
            state.config.idle_timeout,
            conn.recv(),
        )
        .await
        {
            Ok(Ok(Some(frame))) => frame,
            Ok(Ok(None)) => {
                tracing::info!(%participant, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%participant, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%participant, "connection idle, closing");
                break;
            }
        };

        let msg: ClientMessage = match state.codec.decode(&frame) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%participant, error = %e, "undecodable frame");
                reply(&state, participant, ServerMessage::error(e.kind(), e.to_string()))
                    .await;
                continue;
            }
        };
        route(&state, participant, msg).await;
    }

    let _ = conn.close().await;
    // _guard drops here → disconnect cleanup fires.
    Ok(())
}

/// Drains the participant's outbound channel onto the socket.
///
/// Ends when the channel closes (participant unregistered) or the socket
/// refuses a write; either way the registry sees a dead channel on its
/// next send.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut rx: SessionReceiver,
    codec: C,
) {
    while let Some(msg) = rx.recv().await {
        let frame = match codec.encode(&msg) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode outbound record");
                continue;
            }
        };
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "write failed, stopping writer");
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

async fn route<C: Codec>(
    state: &Arc<ServerState<C>>,
    participant: ParticipantId,
    msg: ClientMessage,
) {
    match msg {
        ClientMessage::Connect { player_name } => {
            handle_connect(state, participant, &player_name).await;
        }
        ClientMessage::Action { action, args } => {
            if action.trim().eq_ignore_ascii_case("chat") {
                handle_chat(state, participant, args.join(" "), None).await;
            } else {
                handle_action(state, participant, action, args);
            }
        }
        ClientMessage::Chat { message, target } => {
            handle_chat(state, participant, message, target).await;
        }
        ClientMessage::Status => {
            handle_status(state, participant).await;
        }
    }
}

async fn handle_connect<C: Codec>(
    state: &Arc<ServerState<C>>,
    participant: ParticipantId,
    player_name: &str,
) {
    let name = player_name.trim();
    if name.is_empty() {
        reply(
            state,
            participant,
            ServerMessage::error(ErrorKind::MalformedMessage, "player_name must not be empty"),
        )
        .await;
        return;
    }

    let holds_turn = state.ledger.lock().await.is_current_turn(participant);

    let mut sessions = state.sessions.lock().await;
    if let Err(e) = sessions.set_name(participant, name) {
        sessions.send(participant, ServerMessage::error(e.kind(), e.to_string()));
        return;
    }
    sessions.broadcast(ServerMessage::PlayerJoined {
        player: name.to_string(),
    });
    sessions.send(
        participant,
        ServerMessage::Connected {
            player_name: name.to_string(),
            message: format!("Welcome, {name}"),
        },
    );
    if holds_turn {
        sessions.send(
            participant,
            ServerMessage::NextTurn {
                player: name.to_string(),
                message: format!("It's your turn, {name}!"),
            },
        );
    }
}

/// Starts the pipeline in its own task so a disconnect can't cancel an
/// action halfway. Refusals come back to the sender only.
fn handle_action<C: Codec>(
    state: &Arc<ServerState<C>>,
    participant: ParticipantId,
    action: String,
    args: Vec<String>,
) {
    let pipeline = Arc::clone(&state.pipeline);
    let sessions = Arc::clone(&state.sessions);
    let request = ActionRequest::new(participant, action, args);

    tokio::spawn(async move {
        if let Err(err) = pipeline.process_action(request).await {
            let sessions = sessions.lock().await;
            let message = match &err {
                TurnError::NotYourTurn { current: Some(holder) } => {
                    format!("Not your turn! Waiting for {}", sessions.display_name(*holder))
                }
                TurnError::NotYourTurn { current: None } => "Not your turn!".to_string(),
                TurnError::ActionInProgress => {
                    "Another action is still being resolved.".to_string()
                }
                TurnError::UnknownParticipant(_) => "You are not in the game.".to_string(),
            };
            sessions.send(participant, ServerMessage::error(err.kind(), message));
        }
    });
}

/// Public chat goes to everyone; a `target` makes it a whisper seen by the
/// target and the sender. Never touches the turn order.
async fn handle_chat<C: Codec>(
    state: &Arc<ServerState<C>>,
    participant: ParticipantId,
    message: String,
    target: Option<String>,
) {
    let mut sessions = state.sessions.lock().await;
    let player = sessions.display_name(participant);

    let Some(target) = target else {
        tracing::debug!(%participant, "chat");
        sessions.broadcast(ServerMessage::Chat {
            player,
            message,
            target: None,
        });
        return;
    };

    let Some(recipient) = sessions.find_by_name(&target) else {
        sessions.send(
            participant,
            ServerMessage::error(
                ErrorKind::UnknownParticipant,
                format!("No player named {target}."),
            ),
        );
        return;
    };
    let whisper = ServerMessage::Chat {
        player,
        message,
        target: Some(sessions.display_name(recipient)),
    };
    sessions.send(recipient, whisper.clone());
    if recipient != participant {
        sessions.send(participant, whisper);
    }
}

async fn handle_status<C: Codec>(
    state: &Arc<ServerState<C>>,
    participant: ParticipantId,
) {
    let (status, next) = {
        let ledger = state.ledger.lock().await;
        (ledger.status(participant), ledger.peek_next())
    };

    let sessions = state.sessions.lock().await;
    sessions.send(
        participant,
        ServerMessage::TurnStatus {
            current_player: status.current.map(|id| sessions.display_name(id)),
            is_your_turn: status.is_current_turn,
            position: status.position,
            queue_size: status.size,
            in_flight: status.in_flight,
            up_next: next.map(|id| sessions.display_name(id)),
        },
    );
}

async fn reply<C: Codec>(
    state: &Arc<ServerState<C>>,
    participant: ParticipantId,
    msg: ServerMessage,
) {
    state.sessions.lock().await.send(participant, msg);
}

// ---------------------------------------------------------------------------
// Disconnect
// ---------------------------------------------------------------------------

/// Removes a participant from registry, world and turn order, then tells
/// the remaining table.
///
/// A `next_turn` (or `no_players`) goes out only when leaving moved the
/// turn and no action is in flight; an in-flight action announces the
/// next holder itself when it completes.
async fn disconnect<C: Codec>(state: &Arc<ServerState<C>>, participant: ParticipantId) {
    let name = state.sessions.lock().await.unregister(participant);
    state.world.lock().await.remove_participant(participant);

    let (holder_changed, in_flight, holder) = {
        let mut ledger = state.ledger.lock().await;
        let before = ledger.current();
        ledger.leave(participant);
        (before != ledger.current(), ledger.in_flight(), ledger.current())
    };
    tracing::info!(%participant, name = ?name, "participant disconnected");

    if let Some(name) = name {
        state
            .sessions
            .lock()
            .await
            .broadcast(ServerMessage::PlayerLeft { player: name });
    }
    if holder_changed && !in_flight {
        state.pipeline.announce_holder(holder).await;
    }
}
