// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

use resocket_core::SocketConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub socket: SocketConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub url: String,
}

impl Config {
    pub fn load(config_path: Option<PathBuf>, url: Option<String>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| env::var(key).ok());
        if let Some(url) = url {
            config.server.url = url;
        }
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("RESOCKET_URL") {
            self.server.url = val;
        }
        if let Some(val) = lookup("RESOCKET_RECONNECT_INTERVAL") {
            if let Ok(ms) = val.parse() {
                self.socket.reconnect_interval = ms;
            }
        }
        if let Some(val) = lookup("RESOCKET_MAX_RECONNECT_INTERVAL") {
            if let Ok(ms) = val.parse() {
                self.socket.max_reconnect_interval = ms;
            }
        }
        if let Some(val) = lookup("RESOCKET_RECONNECT_DECAY") {
            if let Ok(decay) = val.parse() {
                self.socket.reconnect_decay = decay;
            }
        }
        if let Some(val) = lookup("RESOCKET_TIMEOUT_INTERVAL") {
            if let Ok(ms) = val.parse() {
                self.socket.timeout_interval = ms;
            }
        }
        if let Some(val) = lookup("RESOCKET_MAX_RECONNECT_ATTEMPTS") {
            if val.is_empty() {
                self.socket.max_reconnect_attempts = None;
            } else if let Ok(max) = val.parse() {
                self.socket.max_reconnect_attempts = Some(max);
            }
        }
        if let Some(val) = lookup("RESOCKET_DEBUG") {
            if let Ok(debug) = val.parse() {
                self.socket.debug = debug;
            }
        }
        if let Some(val) = lookup("RESOCKET_PROTOCOLS") {
            self.socket.protocols = val
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.server.url.is_empty() {
            anyhow::bail!("RESOCKET_URL is required");
        }
        self.socket.validate()?;
        Ok(())
    }
}
