// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

use std::fmt;

/// Readiness of a socket, numbered like the browser `WebSocket.readyState`
/// so callers can compare against the raw values directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ReadyState {
    pub const CONNECTING: u8 = 0;
    pub const OPEN: u8 = 1;
    pub const CLOSING: u8 = 2;
    pub const CLOSED: u8 = 3;

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            Self::CONNECTING => Some(ReadyState::Connecting),
            Self::OPEN => Some(ReadyState::Open),
            Self::CLOSING => Some(ReadyState::Closing),
            Self::CLOSED => Some(ReadyState::Closed),
            _ => None,
        }
    }
}

impl From<ReadyState> for u8 {
    fn from(state: ReadyState) -> Self {
        state.as_u8()
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadyState::Connecting => "CONNECTING",
            ReadyState::Open => "OPEN",
            ReadyState::Closing => "CLOSING",
            ReadyState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_values_match_browser_constants() {
        assert_eq!(ReadyState::Connecting.as_u8(), 0);
        assert_eq!(ReadyState::Open.as_u8(), 1);
        assert_eq!(ReadyState::Closing.as_u8(), 2);
        assert_eq!(u8::from(ReadyState::Closed), ReadyState::CLOSED);
    }

    #[test]
    fn test_from_u8() {
        assert_eq!(ReadyState::from_u8(1), Some(ReadyState::Open));
        assert_eq!(ReadyState::from_u8(3), Some(ReadyState::Closed));
        assert_eq!(ReadyState::from_u8(4), None);
    }
}
