// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

use super::{ConnectRequest, Connector, TransportCommand, TransportSink};
use resocket_core::{CloseInfo, Message};
use tokio::sync::mpsc;

/// Hands every attempt to the test, which then plays the remote side.
pub(crate) struct ScriptedConnector {
    attempts: mpsc::UnboundedSender<ScriptedTransport>,
}

pub(crate) struct ScriptedTransport {
    pub request: ConnectRequest,
    pub sink: TransportSink,
    pub commands: mpsc::UnboundedReceiver<TransportCommand>,
}

impl ScriptedConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ScriptedTransport>) {
        let (attempts, rx) = mpsc::unbounded_channel();
        (Self { attempts }, rx)
    }
}

impl Connector for ScriptedConnector {
    fn connect(
        &self,
        request: ConnectRequest,
        sink: TransportSink,
        commands: mpsc::UnboundedReceiver<TransportCommand>,
    ) {
        let _ = self.attempts.send(ScriptedTransport {
            request,
            sink,
            commands,
        });
    }
}

impl ScriptedTransport {
    pub fn open(&self, protocol: Option<&str>) {
        self.sink.opened(protocol.map(str::to_string));
    }

    pub fn receive(&self, message: impl Into<Message>) {
        self.sink.message(message.into());
    }

    /// The connection goes away without a closing handshake.
    pub fn drop_connection(&self) {
        self.sink.closed(CloseInfo::abnormal(""));
    }

    pub async fn next_command(&mut self) -> TransportCommand {
        self.commands
            .recv()
            .await
            .expect("controller dropped the transport")
    }

    /// Waits for a close request and acknowledges it like a well-behaved peer.
    pub async fn complete_close(&mut self) -> (Option<u16>, String) {
        loop {
            if let TransportCommand::Close { code, reason } = self.next_command().await {
                let info = CloseInfo::clean(code.unwrap_or(CloseInfo::NO_STATUS), reason.clone());
                self.sink.closed(info);
                return (code, reason);
            }
        }
    }
}
