// crates/rps-client/src/config.rs

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Configuration for the game client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `host:port` of the game server.
    pub server_addr: String,
    /// Local identity, sent with every message.
    pub player_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:5000".to_string(),
            player_name: "Player".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(server_addr: impl Into<String>, player_name: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            player_name: player_name.into(),
        }
    }

    /// Load from a TOML file; missing keys keep their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}
