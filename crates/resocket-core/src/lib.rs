// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

pub mod backoff;
pub mod config;
pub mod error;
pub mod event;
pub mod message;
pub mod state;

pub use backoff::Backoff;
pub use config::{ConfigError, SocketConfig};
pub use error::{Error, Result};
pub use event::{CloseInfo, Event, EventKind, RetryInfo};
pub use message::{BinaryType, Message};
pub use state::ReadyState;
