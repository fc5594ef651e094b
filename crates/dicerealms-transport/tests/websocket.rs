//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use dicerealms_transport::{
        Connection, Handshake, Transport, TransportError, WebSocketTransport,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on port 0, accepts one client and returns both ends.
    async fn connected_pair() -> (
        dicerealms_transport::WebSocketConnection,
        ClientWs,
    ) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have addr");

        let server_handle = tokio::spawn(async move {
            let pending = transport.accept().await.expect("should accept");
            pending.complete().await.expect("should upgrade")
        });

        let (client, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("client should connect");
        let server = server_handle.await.expect("task should complete");
        (server, client)
    }

    #[tokio::test]
    async fn test_websocket_send_and_receive_text_frames() {
        let (server_conn, mut client_ws) = connected_pair().await;
        assert!(server_conn.id().get() > 0);

        // --- Server sends, client receives a text frame ---
        server_conn
            .send(r#"{"type":"welcome"}"#)
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"type":"welcome"}"#);

        // --- Client sends, server receives ---
        client_ws
            .send(Message::text("hello from client"))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, "hello from client");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_binary_frame_is_read_as_text() {
        let (server_conn, mut client_ws) = connected_pair().await;

        client_ws
            .send(Message::Binary(b"{\"type\":\"status\"}".to_vec().into()))
            .await
            .unwrap();

        let received = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(received, "{\"type\":\"status\"}");
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_pending() {
        // A reader parked in `recv` must not block the writer half.
        let (server_conn, mut client_ws) = connected_pair().await;
        let server_conn = std::sync::Arc::new(server_conn);

        let reader = {
            let conn = std::sync::Arc::clone(&server_conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::task::yield_now().await;

        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            server_conn.send("ping"),
        )
        .await
        .expect("send should not wait for recv")
        .expect("send should succeed");

        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), "ping");

        client_ws.send(Message::Close(None)).await.unwrap();
        let read = reader.await.unwrap().expect("recv should not error");
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (server_conn, mut client_ws) = connected_pair().await;

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_bind_rejects_bad_address() {
        let err = WebSocketTransport::bind("127.0.0.1:99999")
            .await
            .err()
            .expect("port out of range");
        assert!(matches!(err, TransportError::Bind { .. }));
        assert!(err.to_string().contains("127.0.0.1:99999"));
    }

    #[tokio::test]
    async fn test_websocket_close_twice_is_quiet() {
        let (server_conn, _client_ws) = connected_pair().await;
        server_conn.close().await.expect("first close");
        server_conn.close().await.expect("second close");
    }

    #[tokio::test]
    async fn test_websocket_silent_peer_does_not_block_accept() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind")
            .with_handshake_timeout(Duration::from_millis(200));
        let addr = transport.local_addr().expect("should have addr");

        // Connects but never sends an upgrade request.
        let _silent = tokio::net::TcpStream::connect(addr).await.unwrap();

        let server = tokio::spawn(async move {
            let stalled = transport.accept().await.expect("accept silent peer");
            let stalled = tokio::spawn(stalled.complete());
            let live = transport
                .accept()
                .await
                .expect("accept real client")
                .complete()
                .await
                .expect("real client should upgrade");
            (live, stalled.await.expect("task should complete"))
        });

        let (mut client_ws, _) = tokio::time::timeout(
            Duration::from_secs(3),
            tokio_tungstenite::connect_async(format!("ws://{addr}")),
        )
        .await
        .expect("real client should not wait on the silent one")
        .expect("client should connect");

        let (live, stalled) = server.await.expect("task should complete");
        assert!(matches!(stalled, Err(TransportError::Handshake { .. })));

        live.send("hi").await.expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), "hi");
    }
}
