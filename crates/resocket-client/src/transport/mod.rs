// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

//! Seam between the lifecycle controller and the underlying duplex connection.
//!
//! A [`Connector`] starts one attempt per call. The attempt reports back through its
//! [`TransportSink`] and is driven through the command channel that the controller
//! wraps in a [`TransportHandle`]. Every attempt must end with exactly one `closed`
//! notification.

#[cfg(test)]
pub(crate) mod scripted;
pub mod ws;

use resocket_core::{BinaryType, CloseInfo, Error, Message, ReadyState, Result};
use std::time::Duration;
use tokio::sync::mpsc;

pub use ws::WsConnector;

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectRequest {
    pub url: String,
    pub protocols: Vec<String>,
    pub binary_type: BinaryType,
    /// How long to wait for the peer to answer a close frame.
    pub close_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    Send(Message),
    /// `None` closes without a status code.
    Close { code: Option<u16>, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened { protocol: Option<String> },
    Message(Message),
    Error(String),
    Closed(CloseInfo),
}

pub(crate) type TaggedEvent = (u64, TransportEvent);

pub trait Connector: Send + Sync + 'static {
    /// Checked once when the socket is created.
    fn validate(&self, _url: &str) -> Result<()> {
        Ok(())
    }

    fn connect(
        &self,
        request: ConnectRequest,
        sink: TransportSink,
        commands: mpsc::UnboundedReceiver<TransportCommand>,
    );
}

/// Notification side of one attempt. Events carry the attempt's generation so the
/// controller can ignore a transport it has already replaced.
#[derive(Debug, Clone)]
pub struct TransportSink {
    generation: u64,
    events: mpsc::UnboundedSender<TaggedEvent>,
}

impl TransportSink {
    pub(crate) fn new(generation: u64, events: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self { generation, events }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn opened(&self, protocol: Option<String>) -> bool {
        self.emit(TransportEvent::Opened { protocol })
    }

    pub fn message(&self, message: Message) -> bool {
        self.emit(TransportEvent::Message(message))
    }

    pub fn error(&self, error: impl Into<String>) -> bool {
        self.emit(TransportEvent::Error(error.into()))
    }

    pub fn closed(&self, info: CloseInfo) -> bool {
        self.emit(TransportEvent::Closed(info))
    }

    /// True once the owning socket has shut down.
    pub fn is_detached(&self) -> bool {
        self.events.is_closed()
    }

    fn emit(&self, event: TransportEvent) -> bool {
        self.events.send((self.generation, event)).is_ok()
    }
}

/// Controller-side view of one attempt.
#[derive(Debug)]
pub struct TransportHandle {
    generation: u64,
    commands: mpsc::UnboundedSender<TransportCommand>,
    state: ReadyState,
}

impl TransportHandle {
    pub(crate) fn new(generation: u64, commands: mpsc::UnboundedSender<TransportCommand>) -> Self {
        Self {
            generation,
            commands,
            state: ReadyState::Connecting,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn mark_open(&mut self) {
        self.state = ReadyState::Open;
    }

    pub fn send(&self, message: Message) -> Result<()> {
        if self.state != ReadyState::Open {
            return Err(Error::InvalidState(format!(
                "transport is {}, cannot send",
                self.state
            )));
        }
        self.commands
            .send(TransportCommand::Send(message))
            .map_err(|_| Error::Transport("transport has stopped".to_string()))
    }

    /// Returns false when the transport is already gone and will never report `closed`.
    pub fn close(&mut self, code: Option<u16>, reason: String) -> bool {
        self.state = ReadyState::Closing;
        self.commands
            .send(TransportCommand::Close { code, reason })
            .is_ok()
    }

    /// Resolves once the transport side has dropped its command receiver.
    pub(crate) async fn stopped(&self) {
        self.commands.closed().await
    }
}
