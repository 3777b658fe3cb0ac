// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

use super::{ConnectRequest, Connector, TransportCommand, TransportSink};
use futures::{SinkExt, StreamExt};
use resocket_core::{CloseInfo, Error, Message, Result};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

/// WebSocket transport over plain TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn validate(&self, url: &str) -> Result<()> {
        let request = url
            .into_client_request()
            .map_err(|e| Error::Construction(format!("invalid url {}: {}", url, e)))?;

        match request.uri().scheme_str() {
            Some("ws") => Ok(()),
            Some("wss") => Err(Error::Construction(
                "wss:// needs TLS, which this transport does not provide".to_string(),
            )),
            other => Err(Error::Construction(format!(
                "unsupported url scheme: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    fn connect(
        &self,
        request: ConnectRequest,
        sink: TransportSink,
        commands: mpsc::UnboundedReceiver<TransportCommand>,
    ) {
        tokio::spawn(run(request, sink, commands));
    }
}

fn build_request(request: &ConnectRequest) -> std::result::Result<Request, String> {
    let mut client_request = request
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| format!("invalid url {}: {}", request.url, e))?;

    if !request.protocols.is_empty() {
        let value = HeaderValue::from_str(&request.protocols.join(", "))
            .map_err(|e| format!("invalid sub-protocol list: {}", e))?;
        client_request
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, value);
    }

    Ok(client_request)
}

fn to_ws_message(message: Message) -> WsMessage {
    match message {
        Message::Text(text) => WsMessage::Text(text),
        Message::Binary(data) => WsMessage::Binary(data),
        Message::Blob(data) => WsMessage::Binary(data.to_vec()),
    }
}

fn close_frame(code: Option<u16>, reason: String) -> Option<CloseFrame<'static>> {
    code.map(|code| CloseFrame {
        code: CloseCode::from(code),
        reason: reason.into(),
    })
}

async fn run(
    request: ConnectRequest,
    sink: TransportSink,
    mut commands: mpsc::UnboundedReceiver<TransportCommand>,
) {
    let client_request = match build_request(&request) {
        Ok(client_request) => client_request,
        Err(e) => {
            sink.error(e.clone());
            sink.closed(CloseInfo::abnormal(e));
            return;
        }
    };

    debug!("Connecting to {}", request.url);
    let connect = tokio_tungstenite::connect_async(client_request);
    tokio::pin!(connect);

    let (stream, response) = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok(pair) => break pair,
                Err(e) => {
                    warn!("Failed to connect to {}: {}", request.url, e);
                    sink.error(e.to_string());
                    sink.closed(CloseInfo::abnormal(e.to_string()));
                    return;
                }
            },
            command = commands.recv() => match command {
                Some(TransportCommand::Send(_)) => {
                    debug!("Dropping message queued before the connection was established");
                }
                Some(TransportCommand::Close { .. }) | None => {
                    sink.closed(CloseInfo::abnormal(
                        "closed before the connection was established",
                    ));
                    return;
                }
            },
        }
    };

    let protocol = response
        .headers()
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    info!("Connected to {}", request.url);
    sink.opened(protocol);

    let (mut writer, mut reader) = stream.split();
    let mut received_close: Option<CloseInfo> = None;
    let mut detached = false;
    let mut close_deadline: Option<Instant> = None;

    let info = loop {
        tokio::select! {
            frame = reader.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    sink.message(Message::Text(text));
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    sink.message(request.binary_type.wrap(data));
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    // The reply is queued by tungstenite; keep reading until the stream ends.
                    received_close = Some(match frame {
                        Some(frame) => CloseInfo::clean(frame.code.into(), frame.reason.to_string()),
                        None => CloseInfo::clean(CloseInfo::NO_STATUS, ""),
                    });
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Read error on {}: {}", request.url, e);
                    match received_close.take() {
                        Some(info) => break info,
                        None => {
                            sink.error(e.to_string());
                            break CloseInfo::abnormal(e.to_string());
                        }
                    }
                }
                None => {
                    break received_close
                        .take()
                        .unwrap_or_else(|| CloseInfo::abnormal("connection dropped"));
                }
            },
            command = commands.recv(), if !detached => match command {
                Some(TransportCommand::Send(message)) => {
                    if let Err(e) = writer.send(to_ws_message(message)).await {
                        sink.error(e.to_string());
                    }
                }
                Some(TransportCommand::Close { code, reason }) => {
                    let frame = WsMessage::Close(close_frame(code, reason));
                    match timeout(request.close_timeout, writer.send(frame)).await {
                        Ok(Ok(())) => {
                            close_deadline.get_or_insert(Instant::now() + request.close_timeout);
                        }
                        Ok(Err(e)) => {
                            debug!("Failed to send close frame: {}", e);
                            break received_close
                                .take()
                                .unwrap_or_else(|| CloseInfo::abnormal(e.to_string()));
                        }
                        Err(_) => {
                            warn!("Peer at {} stopped reading, dropping connection", request.url);
                            break CloseInfo::abnormal("close handshake timed out");
                        }
                    }
                }
                None => {
                    detached = true;
                    close_deadline.get_or_insert(Instant::now() + request.close_timeout);
                    let _ = timeout(request.close_timeout, writer.send(WsMessage::Close(None))).await;
                }
            },
            _ = handshake_expired(close_deadline) => {
                warn!("Peer at {} did not answer the close frame", request.url);
                break received_close
                    .take()
                    .unwrap_or_else(|| CloseInfo::abnormal("close handshake timed out"));
            }
        }
    };

    debug!(
        "Connection to {} closed: code={} clean={}",
        request.url, info.code, info.was_clean
    );
    sink.closed(info);
}

async fn handshake_expired(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
