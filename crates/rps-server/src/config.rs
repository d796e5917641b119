//! Configuration for the game server.
//!
//! Defaults match the classic setup (loopback, port 5000). Each field
//! can be overridden via environment variables:
//!
//! - `RPS_BIND_ADDR`        (default: "127.0.0.1")
//! - `RPS_PORT`             (default: "5000")
//! - `RPS_BACKLOG`          (default: "100")
//! - `RPS_MAX_PLAYERS`      (default: "2")
//! - `RPS_POLL_INTERVAL_MS` (default: "100")
//! - `RPS_SERVER_NAME`      (default: "Server")
//! - `RPS_HANDSHAKE_TIMEOUT_MS` (default: "5000")

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address / interface to bind to.
    pub bind_addr: String,

    /// TCP port to listen on. `0` picks a free port (tests).
    pub port: u16,

    /// Listen backlog.
    pub backlog: u32,

    /// Maximum number of simultaneously registered players.
    pub max_players: usize,

    /// Delay between two polls of the round state machine.
    pub poll_interval: Duration,

    /// Identity the server puts into the messages it sends.
    pub server_name: String,

    /// How long a new connection may take to send its opening message.
    pub handshake_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 5000,
            backlog: 100,
            max_players: 2,
            poll_interval: Duration::from_millis(100),
            server_name: "Server".to_string(),
            handshake_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Construct a `ServerConfig` from environment variables, falling
    /// back to the defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let bind_addr = env::var("RPS_BIND_ADDR").unwrap_or(defaults.bind_addr);
        let port = read_env_or_default("RPS_PORT", defaults.port)?;
        let backlog = read_env_or_default("RPS_BACKLOG", defaults.backlog)?;
        let max_players = read_env_or_default("RPS_MAX_PLAYERS", defaults.max_players)?;
        let poll_ms = read_env_or_default("RPS_POLL_INTERVAL_MS", 100u64)?;
        let handshake_ms = read_env_or_default("RPS_HANDSHAKE_TIMEOUT_MS", 5000u64)?;
        let server_name = env::var("RPS_SERVER_NAME").unwrap_or(defaults.server_name);

        Ok(ServerConfig {
            bind_addr,
            port,
            backlog,
            max_players,
            poll_interval: Duration::from_millis(poll_ms),
            server_name,
            handshake_timeout: Duration::from_millis(handshake_ms),
        })
    }

    /// Loopback config on an ephemeral port with a short poll interval.
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            poll_interval: Duration::from_millis(10),
            handshake_timeout: Duration::from_millis(500),
            ..Self::default()
        }
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => Ok(val.parse::<T>()?),
        Err(_) => Ok(default),
    }
}
