//! Error types for the game server.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured endpoint does not parse as a socket address.
    #[error("invalid bind address {0:?}")]
    InvalidAddress(String),

    /// Another process (probably another server) holds the endpoint.
    #[error("the endpoint {0} is already in use")]
    AddressInUse(String),

    /// Any other failure while setting up the listener.
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A loop touched a round entry that no longer belongs to it.
    #[error("player {0:?} is not registered on this connection")]
    UnknownPlayer(String),
}
