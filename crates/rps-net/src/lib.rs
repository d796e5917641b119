//! rps-net
//!
//! Plumbing shared by the client and server roles:
//! - [`supervisor`] : cancellable, reusable group of async tasks
//! - [`endpoint`]   : framed send/receive and the disposal contract

pub mod endpoint;
pub mod supervisor;

pub use endpoint::{shutdown_stream, Endpoint, EndpointError, FramedReader};
pub use supervisor::TaskSupervisor;

pub use tokio_util::sync::CancellationToken;
