// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

use crate::controller::{Command, Controller, Status};
use crate::notifier::Notifier;
use crate::transport::{Connector, WsConnector};
use resocket_core::{CloseInfo, Error, Event, EventKind, Message, ReadyState, Result, SocketConfig};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// A WebSocket that reconnects on its own after unexpected drops.
///
/// Cloning yields another handle to the same connection. The connection is torn down
/// by [`dispose`](Self::dispose) or once every handle has been dropped.
#[derive(Clone)]
pub struct ReconnectingSocket {
    inner: Arc<Shared>,
}

struct Shared {
    url: String,
    config: Arc<SocketConfig>,
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<Status>,
    notifier: Notifier,
}

impl ReconnectingSocket {
    pub fn new(url: impl Into<String>, config: SocketConfig) -> Result<Self> {
        Self::with_connector(url, config, WsConnector)
    }

    /// Must be called from within a tokio runtime.
    pub fn with_connector<C: Connector>(
        url: impl Into<String>,
        config: SocketConfig,
        connector: C,
    ) -> Result<Self> {
        let url = url.into();
        config.validate()?;
        connector.validate(&url)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            Error::Construction("a tokio runtime is required to drive the socket".to_string())
        })?;

        let config = Arc::new(config);
        let notifier = Notifier::new(config.debug);
        let initial = if config.automatic_open {
            ReadyState::Connecting
        } else {
            ReadyState::Closed
        };
        let (status_tx, status_rx) = watch::channel(Status::new(initial));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let controller = Controller::new(
            url.clone(),
            config.clone(),
            Arc::new(connector),
            notifier.clone(),
            status_tx,
            commands_rx,
        );
        runtime.spawn(controller.run());

        let socket = Self {
            inner: Arc::new(Shared {
                url,
                config,
                commands: commands_tx,
                status: status_rx,
                notifier,
            }),
        };
        if socket.inner.config.automatic_open {
            socket.open();
        }
        Ok(socket)
    }

    pub fn open(&self) {
        self.command(Command::Open);
    }

    pub async fn send(&self, data: impl Into<Message>) -> Result<()> {
        let (reply, result) = oneshot::channel();
        self.inner
            .commands
            .send(Command::Send {
                data: data.into(),
                reply,
            })
            .map_err(|_| Error::Disposed)?;
        result.await.map_err(|_| Error::Disposed)?
    }

    /// Closes with code 1000 and stops reconnecting until the next [`open`](Self::open).
    pub fn close(&self) {
        self.close_with(CloseInfo::NORMAL, "");
    }

    pub fn close_with(&self, code: u16, reason: impl Into<String>) {
        self.command(Command::Close {
            code,
            reason: reason.into(),
        });
    }

    /// Drops the current connection and goes through the normal reconnect path.
    pub fn refresh(&self) {
        self.command(Command::Refresh);
    }

    pub fn dispose(&self) {
        self.command(Command::Dispose);
    }

    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.notifier.set(kind, Arc::new(handler));
    }

    pub fn off(&self, kind: EventKind) -> bool {
        self.inner.notifier.clear(kind)
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn config(&self) -> &SocketConfig {
        &self.inner.config
    }

    pub fn ready_state(&self) -> ReadyState {
        self.inner.status.borrow().ready_state
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.status.borrow().reconnect_attempts
    }

    /// Sub-protocol negotiated by the last successful open.
    pub fn protocol(&self) -> Option<String> {
        self.inner.status.borrow().protocol.clone()
    }

    pub fn status(&self) -> watch::Receiver<Status> {
        self.inner.status.clone()
    }

    pub async fn wait_for(&self, state: ReadyState) -> Result<()> {
        let mut status = self.inner.status.clone();
        status
            .wait_for(|status| status.ready_state == state)
            .await
            .map(|_| ())
            .map_err(|_| Error::Disposed)
    }

    fn command(&self, command: Command) {
        if self.inner.commands.send(command).is_err() {
            tracing::debug!("Socket for {} is disposed, command ignored", self.inner.url);
        }
    }
}

impl std::fmt::Debug for ReconnectingSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectingSocket")
            .field("url", &self.inner.url)
            .field("ready_state", &self.ready_state())
            .field("reconnect_attempts", &self.reconnect_attempts())
            .finish()
    }
}
