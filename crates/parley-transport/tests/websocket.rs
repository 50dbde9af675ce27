//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it with
//! a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;

    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;

    use parley_transport::{
        Connection, Handshake, OriginPolicy, Transport, TransportError,
        WebSocketConnection, WebSocketTransport,
    };
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn connect_client(addr: &str) -> ClientWs {
        let url = format!("ws://{addr}");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    async fn bind() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();
        (transport, addr)
    }

    async fn accept(transport: &mut WebSocketTransport) -> WebSocketConnection {
        transport
            .accept()
            .await
            .expect("should accept")
            .complete()
            .await
            .expect("should upgrade")
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            accept(&mut transport).await
        });
        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.expect("task should complete");

        // Server sends text, client receives a text frame.
        server_conn
            .send(br#"{"type":"leaving"}"#)
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "JSON frames go out as text");
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"type":"leaving"}"#);

        // Client sends, server receives.
        client_ws
            .send(Message::Text(r#"{"type":"leave"}"#.into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"type":"leave"}"#);

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            accept(&mut transport).await
        });
        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_is_parked() {
        // One task sits in recv() while others send on the same handle.
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            accept(&mut transport).await
        });
        let mut client_ws = connect_client(&addr).await;
        let server_conn = Arc::new(server_handle.await.unwrap());

        let reader = Arc::clone(&server_conn);
        let recv_task = tokio::spawn(async move { reader.recv().await });

        let mut senders = Vec::new();
        for i in 0..8 {
            let conn = Arc::clone(&server_conn);
            senders.push(tokio::spawn(async move {
                conn.send(format!("frame-{i}").as_bytes()).await
            }));
        }
        for s in senders {
            s.await.unwrap().expect("send should succeed");
        }

        let mut seen = Vec::new();
        for _ in 0..8 {
            let msg = client_ws.next().await.unwrap().unwrap();
            seen.push(msg.into_text().unwrap().to_string());
        }
        seen.sort();
        let mut expected: Vec<String> =
            (0..8).map(|i| format!("frame-{i}")).collect();
        expected.sort();
        assert_eq!(seen, expected, "every frame arrives intact");

        client_ws.send(Message::Close(None)).await.unwrap();
        let result = recv_task.await.unwrap().expect("recv should not error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_websocket_origin_policy_refuses_unknown_origin() {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind")
            .with_origin_policy(OriginPolicy::from_origins([
                "https://app.test",
            ]));
        let addr = transport.local_addr().unwrap().to_string();
        let mut transport = transport;

        let server_handle = tokio::spawn(async move {
            transport
                .accept()
                .await
                .expect("TCP accept succeeds")
                .complete()
                .await
        });

        let mut request =
            format!("ws://{addr}").into_client_request().unwrap();
        request
            .headers_mut()
            .insert("origin", "https://evil.test".parse().unwrap());
        let client = tokio_tungstenite::connect_async(request).await;
        assert!(client.is_err(), "client should see the upgrade refused");

        let accepted = server_handle.await.unwrap();
        assert!(accepted.is_err(), "refused upgrade never yields a connection");
    }

    #[tokio::test]
    async fn test_websocket_send_after_close_reports_connection_closed() {
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            accept(&mut transport).await
        });
        let _client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        server_conn.close().await.expect("close should succeed");
        let err = server_conn
            .send(b"late")
            .await
            .expect_err("send after close must fail");
        assert!(
            matches!(err, TransportError::ConnectionClosed(ref id) if *id == server_conn.id().to_string()),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn test_accept_returns_before_handshake() {
        // A socket that never sends its upgrade request must not hold up
        // the next one: accept only takes sockets off the listener.
        let (mut transport, addr) = bind().await;
        let _silent = TcpStream::connect(&addr).await.unwrap();

        let stalled = tokio::time::timeout(
            Duration::from_secs(1),
            transport.accept(),
        )
        .await
        .expect("accept must not wait for the handshake")
        .unwrap();

        let server_handle = tokio::spawn(async move {
            accept(&mut transport).await
        });
        let _client_ws = tokio::time::timeout(
            Duration::from_secs(1),
            connect_client(&addr),
        )
        .await
        .expect("second client upgrades while the first is stalled");
        server_handle.await.unwrap();
        drop(stalled);
    }

    #[tokio::test]
    async fn test_stalled_handshake_times_out() {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .unwrap()
            .with_handshake_timeout(Duration::from_millis(100));
        let addr = transport.local_addr().unwrap().to_string();
        let mut transport = transport;
        let _silent = TcpStream::connect(&addr).await.unwrap();

        let pending = transport.accept().await.unwrap();
        let result = pending.complete().await;

        assert!(matches!(result, Err(TransportError::UpgradeFailed(_))));
    }
}
