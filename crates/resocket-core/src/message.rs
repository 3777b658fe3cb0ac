// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// How binary frames are handed to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BinaryType {
    /// Owned byte vector (`arraybuffer` in browser terms).
    #[serde(alias = "arraybuffer")]
    RawBytes,
    /// Cheaply clonable, immutable handle to the frame.
    #[default]
    Blob,
}

impl BinaryType {
    pub fn wrap(self, data: Vec<u8>) -> Message {
        match self {
            BinaryType::RawBytes => Message::Binary(data),
            BinaryType::Blob => Message::Blob(Bytes::from(data)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
    Blob(Bytes),
}

impl Message {
    pub fn len(&self) -> usize {
        match self {
            Message::Text(text) => text.len(),
            Message::Binary(data) => data.len(),
            Message::Blob(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(data) => data,
            Message::Blob(data) => data.to_vec(),
        }
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Message {
    fn from(data: Vec<u8>) -> Self {
        Message::Binary(data)
    }
}

impl From<Bytes> for Message {
    fn from(data: Bytes) -> Self {
        Message::Blob(data)
    }
}
