//! Integration tests for the DiceRealms server: real WebSocket clients
//! against a server on an OS-assigned port.

use std::time::Duration;

use dicerealms::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server from `builder` on a random port and returns the address.
async fn start(builder: DiceRealmsServerBuilder) -> String {
    let server = builder
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");
    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

/// A server with no dramatic pause and scripted dice.
async fn start_server(faces: &[u32]) -> String {
    start(
        DiceRealmsServer::builder()
            .action_delay(Duration::ZERO)
            .dice(ScriptedRoller::new(faces.to_vec())),
    )
    .await
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("send should succeed");
}

/// Next JSON record, skipping control frames.
async fn recv(ws: &mut ClientWs) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a record")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("valid JSON");
        }
    }
}

/// Skips records until one of type `ty` arrives.
async fn recv_type(ws: &mut ClientWs, ty: &str) -> Value {
    loop {
        let value = recv(ws).await;
        if value["type"] == ty {
            return value;
        }
    }
}

/// Connects, reads the welcome, and joins under `name`.
async fn join(addr: &str, name: &str) -> ClientWs {
    let mut ws = connect(addr).await;
    recv_type(&mut ws, "welcome").await;
    send(&mut ws, json!({"type": "connect", "player_name": name})).await;
    recv_type(&mut ws, "connected").await;
    ws
}

// =========================================================================
// Connection lifecycle
// =========================================================================

#[tokio::test]
async fn test_welcome_is_first_record() {
    let addr = start_server(&[]).await;
    let mut ws = connect(&addr).await;

    let welcome = recv(&mut ws).await;
    assert_eq!(welcome["type"], "welcome");
    assert!(welcome["player_id"].is_u64());
    assert_eq!(
        welcome["message"],
        "Welcome to DiceRealms! Send a 'connect' message to join the game."
    );
}

#[tokio::test]
async fn test_connect_announces_join_and_first_turn() {
    let addr = start_server(&[]).await;
    let mut ws = connect(&addr).await;
    recv_type(&mut ws, "welcome").await;

    send(&mut ws, json!({"type": "connect", "player_name": "Alice"})).await;

    assert_eq!(
        recv(&mut ws).await,
        json!({"type": "player_joined", "player": "Alice"})
    );
    assert_eq!(
        recv(&mut ws).await,
        json!({"type": "connected", "player_name": "Alice", "message": "Welcome, Alice"})
    );
    assert_eq!(
        recv(&mut ws).await,
        json!({"type": "next_turn", "player": "Alice", "message": "It's your turn, Alice!"})
    );
}

#[tokio::test]
async fn test_connect_rejects_empty_and_repeated_names() {
    let addr = start_server(&[]).await;
    let mut ws = connect(&addr).await;
    recv_type(&mut ws, "welcome").await;

    send(&mut ws, json!({"type": "connect", "player_name": "   "})).await;
    let err = recv_type(&mut ws, "error").await;
    assert_eq!(err["kind"], "malformed_message");

    send(&mut ws, json!({"type": "connect", "player_name": "Alice"})).await;
    recv_type(&mut ws, "connected").await;
    send(&mut ws, json!({"type": "connect", "player_name": "Mallory"})).await;
    let err = recv_type(&mut ws, "error").await;
    assert!(err["message"].as_str().unwrap().contains("Alice"));
}

#[tokio::test]
async fn test_malformed_frame_gets_private_error_and_connection_survives() {
    let addr = start_server(&[]).await;
    let mut ws = join(&addr, "Alice").await;

    ws.send(Message::text("this is not json")).await.unwrap();
    let err = recv_type(&mut ws, "error").await;
    assert_eq!(err["kind"], "malformed_message");

    send(&mut ws, json!({"type": "teleport"})).await;
    let err = recv_type(&mut ws, "error").await;
    assert_eq!(err["kind"], "malformed_message");

    send(&mut ws, json!({"type": "status"})).await;
    let status = recv_type(&mut ws, "turn_status").await;
    assert_eq!(status["current_player"], "Alice");
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let addr = start(
        DiceRealmsServer::builder()
            .action_delay(Duration::ZERO)
            .idle_timeout(Duration::from_millis(200)),
    )
    .await;
    let mut ws = connect(&addr).await;
    recv_type(&mut ws, "welcome").await;

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "server should close an idle connection");
}

#[tokio::test]
async fn test_silent_socket_does_not_stall_new_players() {
    let addr = start_server(&[]).await;

    // Connects at the TCP level and never sends an upgrade request.
    let _silent = tokio::net::TcpStream::connect(&addr).await.unwrap();

    let joined = tokio::time::timeout(Duration::from_secs(3), join(&addr, "Alice")).await;
    assert!(joined.is_ok(), "a stalled handshake should not block the listener");
}

// =========================================================================
// Turns and actions
// =========================================================================

#[tokio::test]
async fn test_roll_is_broadcast_and_turn_passes() {
    let addr = start_server(&[4, 3]).await;
    let mut alice = join(&addr, "Alice").await;
    let mut bob = join(&addr, "Bob").await;

    send(
        &mut alice,
        json!({"type": "action", "action": "roll", "args": ["2d6"]}),
    )
    .await;

    for ws in [&mut alice, &mut bob] {
        let announce = recv_type(ws, "action_announcement").await;
        assert_eq!(
            announce,
            json!({
                "type": "action_announcement",
                "player": "Alice",
                "action": "roll",
                "args": ["2d6"],
                "status": "starting",
            })
        );

        let result = recv(ws).await;
        assert_eq!(result["type"], "action_result");
        assert_eq!(result["success"], true);
        assert_eq!(result["details"]["total"], 7);
        assert_eq!(result["details"]["parts"], json!([4, 3]));

        let next = recv(ws).await;
        assert_eq!(next["type"], "next_turn");
        assert_eq!(next["player"], "Bob");
    }
}

#[tokio::test]
async fn test_out_of_turn_action_is_refused_privately() {
    let addr = start_server(&[1]).await;
    let mut alice = join(&addr, "Alice").await;
    let mut bob = join(&addr, "Bob").await;

    send(&mut bob, json!({"type": "action", "action": "roll", "args": ["1d6"]})).await;
    let err = recv_type(&mut bob, "error").await;
    assert_eq!(err["kind"], "not_your_turn");
    assert_eq!(err["message"], "Not your turn! Waiting for Alice");

    // Alice still holds the turn.
    send(&mut alice, json!({"type": "status"})).await;
    let status = recv_type(&mut alice, "turn_status").await;
    assert_eq!(status["is_your_turn"], true);
    assert_eq!(status["in_flight"], false);
}

#[tokio::test]
async fn test_failed_action_still_passes_turn() {
    let addr = start_server(&[]).await;
    let mut alice = join(&addr, "Alice").await;
    let mut bob = join(&addr, "Bob").await;

    send(&mut alice, json!({"type": "action", "action": "roll", "args": ["xdy"]})).await;

    let result = recv_type(&mut bob, "action_result").await;
    assert_eq!(result["success"], false);
    assert_eq!(result["details"], json!({}));
    let next = recv(&mut bob).await;
    assert_eq!(next["player"], "Bob");
}

#[tokio::test]
async fn test_move_reports_rooms() {
    let addr = start_server(&[]).await;
    let mut alice = join(&addr, "Alice").await;

    send(&mut alice, json!({"type": "action", "action": "move", "args": ["south"]})).await;
    let result = recv_type(&mut alice, "action_result").await;
    assert_eq!(result["success"], true);
    assert_eq!(
        result["details"],
        json!({"direction": "south", "from": "Town Square", "to": "Tavern"})
    );
}

#[tokio::test]
async fn test_status_reports_queue() {
    let addr = start_server(&[]).await;
    let _alice = join(&addr, "Alice").await;
    let mut bob = join(&addr, "Bob").await;

    send(&mut bob, json!({"type": "status"})).await;
    assert_eq!(
        recv_type(&mut bob, "turn_status").await,
        json!({
            "type": "turn_status",
            "current_player": "Alice",
            "is_your_turn": false,
            "position": 1,
            "queue_size": 2,
            "in_flight": false,
            "up_next": "Bob",
        })
    );
}

#[tokio::test]
async fn test_holder_disconnect_hands_turn_on() {
    let addr = start_server(&[]).await;
    let mut alice = join(&addr, "Alice").await;
    let mut bob = join(&addr, "Bob").await;

    alice.close(None).await.unwrap();

    assert_eq!(
        recv_type(&mut bob, "player_left").await,
        json!({"type": "player_left", "player": "Alice"})
    );
    let next = recv_type(&mut bob, "next_turn").await;
    assert_eq!(next["player"], "Bob");
}

// =========================================================================
// Chat
// =========================================================================

#[tokio::test]
async fn test_chat_ignores_turn_order() {
    let addr = start_server(&[]).await;
    let mut alice = join(&addr, "Alice").await;
    let mut bob = join(&addr, "Bob").await;

    send(&mut bob, json!({"type": "chat", "message": "hurry up"})).await;
    assert_eq!(
        recv_type(&mut alice, "chat").await,
        json!({"type": "chat", "player": "Bob", "message": "hurry up"})
    );

    send(
        &mut bob,
        json!({"type": "action", "action": "chat", "args": ["still", "waiting"]}),
    )
    .await;
    let chat = recv_type(&mut alice, "chat").await;
    assert_eq!(chat["message"], "still waiting");

    send(&mut alice, json!({"type": "status"})).await;
    let status = recv_type(&mut alice, "turn_status").await;
    assert_eq!(status["is_your_turn"], true);
}

#[tokio::test]
async fn test_whisper_reaches_target_only() {
    let addr = start_server(&[]).await;
    let mut alice = join(&addr, "Alice").await;
    let mut bob = join(&addr, "Bob").await;
    let mut carol = join(&addr, "Carol").await;

    send(
        &mut alice,
        json!({"type": "chat", "message": "psst", "target": "bob"}),
    )
    .await;
    let whisper = recv_type(&mut bob, "chat").await;
    assert_eq!(
        whisper,
        json!({"type": "chat", "player": "Alice", "message": "psst", "target": "Bob"})
    );
    assert_eq!(recv_type(&mut alice, "chat").await["target"], "Bob");

    // Anything queued for Carol before the whisper would arrive first.
    send(&mut carol, json!({"type": "status"})).await;
    assert_eq!(recv(&mut carol).await["type"], "turn_status");

    send(
        &mut alice,
        json!({"type": "chat", "message": "hello?", "target": "Nobody"}),
    )
    .await;
    let err = recv_type(&mut alice, "error").await;
    assert_eq!(err["kind"], "unknown_participant");
}
