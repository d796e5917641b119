//! rps-client
//!
//! Player side of the rock/paper/scissors game: connects, performs the
//! `CON` handshake, then sends one move per round and reports the
//! server's messages as a stream of events.

pub mod client;
pub mod config;
pub mod error;

pub use client::{ClientEvents, ConnectionState, GameClient};
pub use config::ClientConfig;
pub use error::ClientError;
