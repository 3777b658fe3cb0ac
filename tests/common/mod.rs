// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

use axum::{
    extract::ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade},
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use resocket_client::{Event, EventKind, ReadyState, ReconnectingSocket};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

pub const WAIT: Duration = Duration::from_secs(10);

/// WebSocket echo server that can be stopped and restarted on the same port.
pub struct EchoServer {
    pub port: u16,
    connections: Arc<AtomicUsize>,
    kill: broadcast::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl EchoServer {
    pub async fn start() -> Self {
        Self::start_on(get_free_port().await).await
    }

    pub async fn start_on(port: u16) -> Self {
        init_tracing();
        let (kill, _) = broadcast::channel(4);
        let mut server = Self {
            port,
            connections: Arc::new(AtomicUsize::new(0)),
            kill,
            handle: None,
        };
        server.spawn().await;
        server
    }

    pub fn url(&self, path: &str) -> String {
        format!("ws://127.0.0.1:{}/{}", self.port, path.trim_start_matches('/'))
    }

    /// Number of WebSocket upgrades accepted so far, across restarts.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Stops listening and drops every live connection without a closing handshake.
    pub async fn stop(&mut self) {
        let _ = self.kill.send(());
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    pub async fn restart(&mut self) {
        self.stop().await;
        self.spawn().await;
    }

    async fn spawn(&mut self) {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        let mut listener = None;
        for _ in 0..50 {
            match tokio::net::TcpListener::bind(addr).await {
                Ok(bound) => {
                    listener = Some(bound);
                    break;
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }
        let listener = listener.expect("Failed to bind echo server port");

        let app = router(self.connections.clone(), self.kill.clone());
        self.handle = Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Echo server error: {}", e);
            }
        }));
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        let _ = self.kill.send(());
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn router(connections: Arc<AtomicUsize>, kill: broadcast::Sender<()>) -> Router {
    let echo_connections = connections.clone();
    let echo_kill = kill.clone();
    let chat_connections = connections.clone();
    let chat_kill = kill.clone();

    Router::new()
        .route(
            "/echo",
            get(move |ws: WebSocketUpgrade| {
                let connections = echo_connections.clone();
                let kill = echo_kill.subscribe();
                async move {
                    ws.on_upgrade(move |socket| async move {
                        connections.fetch_add(1, Ordering::SeqCst);
                        echo(socket, kill).await;
                    })
                }
            }),
        )
        .route(
            "/chat",
            get(move |ws: WebSocketUpgrade| {
                let connections = chat_connections.clone();
                let kill = chat_kill.subscribe();
                async move {
                    ws.protocols(["chat"]).on_upgrade(move |socket| async move {
                        connections.fetch_add(1, Ordering::SeqCst);
                        echo(socket, kill).await;
                    })
                }
            }),
        )
        .route(
            "/goodbye",
            get(move |ws: WebSocketUpgrade| {
                let connections = connections.clone();
                async move {
                    ws.on_upgrade(move |socket| async move {
                        connections.fetch_add(1, Ordering::SeqCst);
                        goodbye(socket).await;
                    })
                }
            }),
        )
}

async fn echo(socket: WebSocket, mut kill: broadcast::Receiver<()>) {
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            _ = kill.recv() => break,
            msg = receiver.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    let response = format!("Echo: {}", text);
                    if sender.send(WsMessage::Text(response)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    if sender.send(WsMessage::Binary(data)).await.is_err() {
                        break;
                    }
                }
                // Keep reading so the close reply gets flushed.
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
        }
    }
}

async fn goodbye(mut socket: WebSocket) {
    let frame = CloseFrame {
        code: 4000,
        reason: "bye".into(),
    };
    if socket.send(WsMessage::Close(Some(frame))).await.is_err() {
        return;
    }
    while let Some(Ok(_)) = socket.recv().await {}
}

pub async fn get_free_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    listener.local_addr().unwrap().port()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resocket_client=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Forwards every event the socket raises into a channel.
pub fn record(socket: &ReconnectingSocket) -> mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel();
    for kind in EventKind::ALL {
        let tx = tx.clone();
        socket.on(kind, move |event| {
            let _ = tx.send(event.clone());
        });
    }
    rx
}

/// Skips events until one matches.
pub async fn expect_event<F>(events: &mut mpsc::UnboundedReceiver<Event>, predicate: F) -> Event
where
    F: Fn(&Event) -> bool,
{
    let wait = async {
        while let Some(event) = events.recv().await {
            if predicate(&event) {
                return event;
            }
        }
        panic!("event stream ended");
    };
    tokio::time::timeout(WAIT, wait)
        .await
        .expect("Timed out waiting for event")
}

pub async fn wait_for_state(socket: &ReconnectingSocket, state: ReadyState) {
    tokio::time::timeout(WAIT, socket.wait_for(state))
        .await
        .expect("Timed out waiting for ready state")
        .expect("Socket disposed");
}
