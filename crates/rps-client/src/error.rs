// crates/rps-client/src/error.rs

use rps_net::EndpointError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to send {what}: {source}")]
    Send {
        what: &'static str,
        #[source]
        source: EndpointError,
    },
}
