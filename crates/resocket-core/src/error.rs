// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

use crate::config::ConfigError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot create socket: {0}")]
    Construction(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("INVALID_STATE_ERR: {0}")]
    InvalidState(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("socket has been disposed")]
    Disposed,
}

impl Error {
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Error::InvalidState(_))
    }
}
