// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

use crate::config::SocketConfig;
use std::time::Duration;

/// Exponential backoff without jitter: `min(base * decay^attempt, max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    base_ms: f64,
    max_ms: f64,
    decay: f64,
}

impl Backoff {
    pub fn from_config(config: &SocketConfig) -> Self {
        Self {
            base_ms: config.reconnect_interval as f64,
            max_ms: config.max_reconnect_interval as f64,
            decay: config.reconnect_decay,
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        // f64::min yields the cap for an overflowed (infinite) product.
        let ms = (self.base_ms * self.decay.powi(exponent)).min(self.max_ms);
        Duration::from_nanos((ms * 1_000_000.0).round() as u64)
    }
}
