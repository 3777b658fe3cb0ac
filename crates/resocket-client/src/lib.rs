// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

pub mod config;
mod controller;
pub mod notifier;
pub mod socket;
pub mod transport;

pub use controller::Status;
pub use notifier::{Dispatch, EventHandler, Notifier};
pub use resocket_core::{
    BinaryType, CloseInfo, Error, Event, EventKind, Message, ReadyState, Result, RetryInfo,
    SocketConfig,
};
pub use socket::ReconnectingSocket;
pub use transport::{Connector, WsConnector};
