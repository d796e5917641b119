//! rps-server
//!
//! Two-player rock/paper/scissors server over TCP.

pub mod config;
pub mod error;
pub mod registry;
pub mod round;
pub mod server;
pub mod types;

// internal: the per-player loops
mod player;

pub use config::ServerConfig;
pub use error::ServerError;
pub use server::GameServer;
