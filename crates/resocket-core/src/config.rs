// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

use crate::message::BinaryType;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Tunables of a reconnecting socket. Intervals are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketConfig {
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval: u64,
    #[serde(default = "default_max_reconnect_interval")]
    pub max_reconnect_interval: u64,
    #[serde(default = "default_reconnect_decay")]
    pub reconnect_decay: f64,
    #[serde(default = "default_timeout_interval")]
    pub timeout_interval: u64,
    /// Unlimited when absent.
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,
    #[serde(default)]
    pub automatic_open: bool,
    #[serde(default)]
    pub binary_type: BinaryType,
    #[serde(default)]
    pub debug: bool,
    /// Sub-protocols offered on every attempt.
    #[serde(default)]
    pub protocols: Vec<String>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("reconnect_interval must be greater than zero")]
    ReconnectInterval,

    #[error("max_reconnect_interval ({max}) must not be below reconnect_interval ({base})")]
    MaxReconnectInterval { max: u64, base: u64 },

    #[error("reconnect_decay must be a finite number greater than 1, got {0}")]
    ReconnectDecay(f64),

    #[error("timeout_interval must be greater than zero")]
    TimeoutInterval,

    #[error("max_reconnect_attempts must be a positive number when set")]
    MaxReconnectAttempts,

    #[error("invalid sub-protocol: {0:?}")]
    Protocol(String),
}

fn default_reconnect_interval() -> u64 {
    1000
}

fn default_max_reconnect_interval() -> u64 {
    30000
}

fn default_reconnect_decay() -> f64 {
    1.5
}

fn default_timeout_interval() -> u64 {
    2000
}

impl SocketConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reconnect_interval == 0 {
            return Err(ConfigError::ReconnectInterval);
        }
        if self.max_reconnect_interval < self.reconnect_interval {
            return Err(ConfigError::MaxReconnectInterval {
                max: self.max_reconnect_interval,
                base: self.reconnect_interval,
            });
        }
        if !self.reconnect_decay.is_finite() || self.reconnect_decay <= 1.0 {
            return Err(ConfigError::ReconnectDecay(self.reconnect_decay));
        }
        if self.timeout_interval == 0 {
            return Err(ConfigError::TimeoutInterval);
        }
        if self.max_reconnect_attempts == Some(0) {
            return Err(ConfigError::MaxReconnectAttempts);
        }
        if let Some(bad) = self
            .protocols
            .iter()
            .find(|p| p.is_empty() || p.contains(|c: char| c == ',' || c.is_whitespace()))
        {
            return Err(ConfigError::Protocol(bad.clone()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_interval)
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: default_reconnect_interval(),
            max_reconnect_interval: default_max_reconnect_interval(),
            reconnect_decay: default_reconnect_decay(),
            timeout_interval: default_timeout_interval(),
            max_reconnect_attempts: None,
            automatic_open: false,
            binary_type: BinaryType::default(),
            debug: false,
            protocols: Vec::new(),
        }
    }
}
