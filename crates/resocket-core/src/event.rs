// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

use crate::message::Message;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connecting,
    ConnectTimeout,
    Open,
    Close,
    Closing,
    Message,
    Send,
    MaxRetry,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::Connecting,
        EventKind::ConnectTimeout,
        EventKind::Open,
        EventKind::Close,
        EventKind::Closing,
        EventKind::Message,
        EventKind::Send,
        EventKind::MaxRetry,
        EventKind::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Connecting => "connecting",
            EventKind::ConnectTimeout => "connect-timeout",
            EventKind::Open => "open",
            EventKind::Close => "close",
            EventKind::Closing => "closing",
            EventKind::Message => "message",
            EventKind::Send => "send",
            EventKind::MaxRetry => "maxretry",
            EventKind::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Close details reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
    pub was_clean: bool,
}

impl CloseInfo {
    pub const NORMAL: u16 = 1000;
    pub const NO_STATUS: u16 = 1005;
    pub const ABNORMAL: u16 = 1006;

    pub fn clean(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            was_clean: true,
        }
    }

    /// Connection lost without a closing handshake.
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: Self::ABNORMAL,
            reason: reason.into(),
            was_clean: false,
        }
    }
}

/// Payload of a `connecting` event raised after an unexpected close.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryInfo {
    pub code: u16,
    pub reason: String,
    pub was_clean: bool,
    pub retry_timeout: Duration,
    pub reconnect_attempts: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// `retry` is `None` when an attempt starts, `Some` when a retry is scheduled.
    Connecting { retry: Option<RetryInfo> },
    ConnectTimeout,
    Open { url: String, reconnect_attempt: bool },
    /// `url` is only present for the first unexpected drop of an established connection.
    Close { url: Option<String> },
    Closing,
    Message { data: Message },
    Send { url: String, data: Message },
    MaxRetry,
    Error { error: String },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Connecting { .. } => EventKind::Connecting,
            Event::ConnectTimeout => EventKind::ConnectTimeout,
            Event::Open { .. } => EventKind::Open,
            Event::Close { .. } => EventKind::Close,
            Event::Closing => EventKind::Closing,
            Event::Message { .. } => EventKind::Message,
            Event::Send { .. } => EventKind::Send,
            Event::MaxRetry => EventKind::MaxRetry,
            Event::Error { .. } => EventKind::Error,
        }
    }

    /// Flat JSON object with the `event` kind and the kind-specific fields.
    pub fn to_json(&self) -> Value {
        let mut payload = match self {
            Event::Connecting { retry: Some(retry) } => json!({
                "code": retry.code,
                "reason": retry.reason,
                "wasClean": retry.was_clean,
                "retryTimeout": retry.retry_timeout.as_millis() as u64,
                "reconnectAttempts": retry.reconnect_attempts,
            }),
            Event::Open {
                url,
                reconnect_attempt,
            } => json!({ "url": url, "reconnectAttempt": reconnect_attempt }),
            Event::Close { url: Some(url) } => json!({ "url": url }),
            Event::Message { data } => json!({ "data": data }),
            Event::Send { url, data } => json!({ "url": url, "data": data }),
            Event::Error { error } => json!({ "error": error }),
            _ => json!({}),
        };
        if let Value::Object(map) = &mut payload {
            map.insert("event".to_string(), Value::from(self.kind().as_str()));
        }
        payload
    }
}
