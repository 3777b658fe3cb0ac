// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

use common::{expect_event, record, wait_for_state, EchoServer};
use resocket_client::{BinaryType, Event, Message, ReadyState, ReconnectingSocket, SocketConfig};

fn message_of(event: &Event) -> Option<&Message> {
    match event {
        Event::Message { data } => Some(data),
        _ => None,
    }
}

#[tokio::test]
async fn test_echo_text() {
    let server = EchoServer::start().await;
    let socket = ReconnectingSocket::new(server.url("echo"), SocketConfig::default()).unwrap();
    let mut events = record(&socket);

    socket.open();
    let opened = expect_event(&mut events, |e| matches!(e, Event::Open { .. })).await;
    assert_eq!(
        opened,
        Event::Open {
            url: server.url("echo"),
            reconnect_attempt: false,
        }
    );
    assert_eq!(socket.ready_state(), ReadyState::Open);

    socket.send("Hello WebSocket").await.unwrap();
    let sent = expect_event(&mut events, |e| matches!(e, Event::Send { .. })).await;
    assert_eq!(
        sent,
        Event::Send {
            url: server.url("echo"),
            data: Message::from("Hello WebSocket"),
        }
    );

    let reply = expect_event(&mut events, |e| message_of(e).is_some()).await;
    assert_eq!(
        message_of(&reply),
        Some(&Message::Text("Echo: Hello WebSocket".to_string()))
    );

    socket.dispose();
}

#[tokio::test]
async fn test_binary_defaults_to_blob() {
    let server = EchoServer::start().await;
    let socket = ReconnectingSocket::new(server.url("echo"), SocketConfig::default()).unwrap();
    let mut events = record(&socket);

    socket.open();
    wait_for_state(&socket, ReadyState::Open).await;
    socket.send(vec![1u8, 2, 3, 255]).await.unwrap();

    let reply = expect_event(&mut events, |e| message_of(e).is_some()).await;
    let data = message_of(&reply).unwrap().clone();
    assert!(matches!(data, Message::Blob(_)));
    assert_eq!(data.into_bytes(), vec![1u8, 2, 3, 255]);

    socket.dispose();
}

#[tokio::test]
async fn test_binary_as_raw_bytes() {
    let server = EchoServer::start().await;
    let config = SocketConfig {
        binary_type: BinaryType::RawBytes,
        ..SocketConfig::default()
    };
    let socket = ReconnectingSocket::new(server.url("echo"), config).unwrap();
    let mut events = record(&socket);

    socket.open();
    wait_for_state(&socket, ReadyState::Open).await;
    socket.send(vec![9u8, 8, 7]).await.unwrap();

    let reply = expect_event(&mut events, |e| message_of(e).is_some()).await;
    assert_eq!(message_of(&reply), Some(&Message::Binary(vec![9, 8, 7])));

    socket.dispose();
}

#[tokio::test]
async fn test_protocol_negotiation() {
    let server = EchoServer::start().await;
    let config = SocketConfig {
        protocols: vec!["chat".to_string()],
        ..SocketConfig::default()
    };
    let socket = ReconnectingSocket::new(server.url("chat"), config).unwrap();

    assert_eq!(socket.protocol(), None);
    socket.open();
    wait_for_state(&socket, ReadyState::Open).await;
    assert_eq!(socket.protocol().as_deref(), Some("chat"));

    socket.dispose();
}

#[tokio::test]
async fn test_automatic_open() {
    let server = EchoServer::start().await;
    let config = SocketConfig {
        automatic_open: true,
        ..SocketConfig::default()
    };
    let socket = ReconnectingSocket::new(server.url("echo"), config).unwrap();
    assert_eq!(socket.ready_state(), ReadyState::Connecting);

    wait_for_state(&socket, ReadyState::Open).await;
    assert_eq!(server.connections(), 1);
    assert_eq!(socket.reconnect_attempts(), 0);

    socket.dispose();
}

#[tokio::test]
async fn test_send_before_open_is_rejected() {
    let server = EchoServer::start().await;
    let socket = ReconnectingSocket::new(server.url("echo"), SocketConfig::default()).unwrap();
    assert_eq!(socket.ready_state(), ReadyState::Closed);

    let err = socket.send("too early").await.unwrap_err();
    assert!(err.is_invalid_state());
    assert_eq!(socket.ready_state(), ReadyState::Closed);
    assert_eq!(server.connections(), 0);

    socket.dispose();
}

#[tokio::test]
async fn test_secure_scheme_rejected() {
    let err = ReconnectingSocket::new("wss://127.0.0.1:1/echo", SocketConfig::default()).unwrap_err();
    assert!(matches!(err, resocket_client::Error::Construction(_)));
}
