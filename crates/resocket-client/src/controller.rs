// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

//! Connection lifecycle state machine.
//!
//! The controller runs as one task and owns the session: caller commands, transport
//! notifications and both timers arrive here and are handled one at a time.

use crate::notifier::Notifier;
use crate::transport::{
    ConnectRequest, Connector, TaggedEvent, TransportEvent, TransportHandle, TransportSink,
};
use resocket_core::{
    Backoff, CloseInfo, Error, Event, Message, ReadyState, Result, RetryInfo, SocketConfig,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

pub(crate) enum Command {
    Open,
    Send {
        data: Message,
        reply: oneshot::Sender<Result<()>>,
    },
    Close {
        code: u16,
        reason: String,
    },
    Refresh,
    Dispose,
}

/// Snapshot of the readable socket properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub ready_state: ReadyState,
    pub reconnect_attempts: u32,
    pub protocol: Option<String>,
}

impl Status {
    pub(crate) fn new(ready_state: ReadyState) -> Self {
        Self {
            ready_state,
            reconnect_attempts: 0,
            protocol: None,
        }
    }
}

struct Attempt {
    handle: TransportHandle,
    reconnect_attempt: bool,
    connect_deadline: Option<Instant>,
}

struct PendingRetry {
    generation: u64,
    at: Instant,
}

struct Session {
    attempt: Option<Attempt>,
    retry: Option<PendingRetry>,
    reconnect_attempts: u32,
    forced_close: bool,
    timed_out: bool,
    protocol: Option<String>,
    ready_state: ReadyState,
    generation: u64,
}

enum Input {
    Command(Option<Command>),
    Transport(u64, TransportEvent),
    TransportStopped(u64),
    ConnectTimeout,
    Retry,
}

pub(crate) struct Controller {
    url: String,
    config: Arc<SocketConfig>,
    backoff: Backoff,
    connector: Arc<dyn Connector>,
    notifier: Notifier,
    status: watch::Sender<Status>,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    events_rx: mpsc::UnboundedReceiver<TaggedEvent>,
    session: Session,
}

impl Controller {
    pub(crate) fn new(
        url: String,
        config: Arc<SocketConfig>,
        connector: Arc<dyn Connector>,
        notifier: Notifier,
        status: watch::Sender<Status>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let ready_state = status.borrow().ready_state;
        Self {
            url,
            backoff: Backoff::from_config(&config),
            config,
            connector,
            notifier,
            status,
            commands,
            events_tx,
            events_rx,
            session: Session {
                attempt: None,
                retry: None,
                reconnect_attempts: 0,
                forced_close: false,
                timed_out: false,
                protocol: None,
                ready_state,
                generation: 0,
            },
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            match self.next_input().await {
                Input::Command(None) | Input::Command(Some(Command::Dispose)) => break,
                Input::Command(Some(command)) => self.handle_command(command),
                Input::Transport(generation, event) => self.handle_transport(generation, event),
                Input::TransportStopped(generation) => {
                    if self.is_current(generation) {
                        warn!("Transport for {} stopped without reporting close", self.url);
                        self.on_close(CloseInfo::abnormal("transport stopped"));
                    }
                }
                Input::ConnectTimeout => self.on_connect_timeout(),
                Input::Retry => self.on_retry(),
            }
            self.publish();
        }
        self.shutdown();
    }

    async fn next_input(&mut self) -> Input {
        let connect_deadline = self
            .session
            .attempt
            .as_ref()
            .and_then(|attempt| attempt.connect_deadline);
        let retry_at = self.session.retry.as_ref().map(|retry| retry.at);
        let handle = self.session.attempt.as_ref().map(|attempt| &attempt.handle);

        tokio::select! {
            biased;
            command = self.commands.recv() => Input::Command(command),
            Some((generation, event)) = self.events_rx.recv() => Input::Transport(generation, event),
            generation = transport_stopped(handle) => Input::TransportStopped(generation),
            _ = sleep_until_some(connect_deadline) => Input::ConnectTimeout,
            _ = sleep_until_some(retry_at) => Input::Retry,
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Open => self.open_explicit(),
            Command::Send { data, reply } => {
                let _ = reply.send(self.send(data));
            }
            Command::Close { code, reason } => self.close(code, reason),
            Command::Refresh => self.refresh(),
            Command::Dispose => {}
        }
    }

    fn handle_transport(&mut self, generation: u64, event: TransportEvent) {
        if !self.is_current(generation) {
            debug!("Ignoring {:?} from retired transport #{}", event, generation);
            return;
        }
        match event {
            TransportEvent::Opened { protocol } => self.on_open(protocol),
            TransportEvent::Message(data) => self.emit(Event::Message { data }),
            TransportEvent::Error(error) => self.emit(Event::Error { error }),
            TransportEvent::Closed(info) => self.on_close(info),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.session
            .attempt
            .as_ref()
            .is_some_and(|attempt| attempt.handle.generation() == generation)
    }

    fn open_explicit(&mut self) {
        if self.session.attempt.is_some() {
            debug!("open() ignored: an attempt for {} is already in flight", self.url);
            return;
        }
        self.session.forced_close = false;
        self.session.reconnect_attempts = 0;
        self.open(false);
    }

    fn open(&mut self, reconnect_attempt: bool) {
        self.session.generation += 1;
        self.session.retry = None;

        if reconnect_attempt {
            if let Some(max) = self.config.max_reconnect_attempts {
                // Strictly greater: the attempt numbered `max` still runs.
                if self.session.reconnect_attempts > max {
                    warn!(
                        "Giving up on {} after {} reconnect attempts",
                        self.url, max
                    );
                    self.session.ready_state = ReadyState::Closed;
                    self.emit(Event::MaxRetry);
                    return;
                }
            }
        }

        self.session.ready_state = ReadyState::Connecting;
        self.emit(Event::Connecting { retry: None });
        self.session.timed_out = false;

        let generation = self.session.generation;
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let request = ConnectRequest {
            url: self.url.clone(),
            protocols: self.config.protocols.clone(),
            binary_type: self.config.binary_type,
            close_timeout: self.config.timeout(),
        };
        let sink = TransportSink::new(generation, self.events_tx.clone());

        debug!("Starting attempt #{} for {}", generation, self.url);
        self.session.attempt = Some(Attempt {
            handle: TransportHandle::new(generation, commands_tx),
            reconnect_attempt,
            connect_deadline: Some(Instant::now() + self.config.timeout()),
        });
        self.connector.connect(request, sink, commands_rx);
    }

    fn on_open(&mut self, protocol: Option<String>) {
        let Some(attempt) = self.session.attempt.as_mut() else {
            return;
        };
        attempt.connect_deadline = None;
        attempt.handle.mark_open();
        let reconnect_attempt = attempt.reconnect_attempt;

        self.session.protocol = protocol;
        self.session.ready_state = ReadyState::Open;
        self.session.reconnect_attempts = 0;

        info!("Connected to {}", self.url);
        self.emit(Event::Open {
            url: self.url.clone(),
            reconnect_attempt,
        });
    }

    fn on_close(&mut self, info: CloseInfo) {
        let Some(attempt) = self.session.attempt.take() else {
            return;
        };

        if self.session.forced_close {
            info!("Closed {}", self.url);
            self.session.ready_state = ReadyState::Closed;
            self.emit(Event::Close { url: None });
            return;
        }

        self.session.ready_state = ReadyState::Connecting;
        let retry_timeout = self.backoff.delay(self.session.reconnect_attempts);
        info!(
            "Connection to {} closed (code {}), retrying in {:?}",
            self.url, info.code, retry_timeout
        );
        self.emit(Event::Connecting {
            retry: Some(RetryInfo {
                code: info.code,
                reason: info.reason,
                was_clean: info.was_clean,
                retry_timeout,
                reconnect_attempts: self.session.reconnect_attempts,
            }),
        });

        if !attempt.reconnect_attempt && !self.session.timed_out {
            self.emit(Event::Close {
                url: Some(self.url.clone()),
            });
        }

        self.session.retry = Some(PendingRetry {
            generation: self.session.generation,
            at: Instant::now() + retry_timeout,
        });
    }

    fn on_connect_timeout(&mut self) {
        match self.session.attempt.as_mut() {
            Some(attempt) => attempt.connect_deadline = None,
            None => return,
        }

        warn!(
            "Connection to {} timed out after {:?}",
            self.url,
            self.config.timeout()
        );
        self.emit(Event::ConnectTimeout);
        self.session.timed_out = true;
        self.request_transport_close(None, String::new());
    }

    fn on_retry(&mut self) {
        let Some(retry) = self.session.retry.take() else {
            return;
        };
        // Soft cancellation: a superseded retry fires but does nothing.
        if retry.generation != self.session.generation || self.session.forced_close {
            debug!("Skipping superseded reconnect to {}", self.url);
            return;
        }
        self.session.reconnect_attempts += 1;
        self.open(true);
    }

    fn send(&self, data: Message) -> Result<()> {
        let Some(attempt) = self.session.attempt.as_ref() else {
            return Err(Error::InvalidState(
                "currently reconnecting, cannot send".to_string(),
            ));
        };
        self.emit(Event::Send {
            url: self.url.clone(),
            data: data.clone(),
        });
        attempt.handle.send(data)
    }

    fn close(&mut self, code: u16, reason: String) {
        self.session.forced_close = true;
        // Retires any pending reconnect.
        self.session.generation += 1;

        if self.session.attempt.is_none() {
            self.session.ready_state = ReadyState::Closed;
            return;
        }
        self.session.ready_state = ReadyState::Closing;
        self.emit(Event::Closing);
        self.request_transport_close(Some(code), reason);
    }

    fn refresh(&mut self) {
        if self.session.attempt.is_none() {
            debug!("refresh() ignored: no transport for {}", self.url);
            return;
        }
        self.session.ready_state = ReadyState::Closing;
        self.emit(Event::Closing);
        self.request_transport_close(None, String::new());
    }

    fn request_transport_close(&mut self, code: Option<u16>, reason: String) {
        let delivered = match self.session.attempt.as_mut() {
            Some(attempt) => attempt.handle.close(code, reason),
            None => return,
        };
        if !delivered {
            self.on_close(CloseInfo::abnormal("transport stopped"));
        }
    }

    fn emit(&self, event: Event) {
        // Handlers observe the state the event describes.
        self.publish();
        self.notifier.emit(&event);
    }

    fn publish(&self) {
        let status = Status {
            ready_state: self.session.ready_state,
            reconnect_attempts: self.session.reconnect_attempts,
            protocol: self.session.protocol.clone(),
        };
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    fn shutdown(&mut self) {
        if let Some(mut attempt) = self.session.attempt.take() {
            attempt
                .handle
                .close(Some(CloseInfo::NORMAL), String::new());
        }
        self.session.retry = None;
        self.session.ready_state = ReadyState::Closed;
        self.notifier.clear_all();
        self.publish();
        debug!("Socket for {} disposed", self.url);
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn transport_stopped(handle: Option<&TransportHandle>) -> u64 {
    match handle {
        Some(handle) => {
            handle.stopped().await;
            handle.generation()
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
