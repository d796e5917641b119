//! Connection endpoint shared by the client and server roles.
//!
//! An [`Endpoint`] is the part of a communicator that does not depend
//! on its role:
//! - one [`TaskSupervisor`] for the role's top-level run loop,
//! - delimited send/receive over any async byte stream,
//! - the shared interpretation of received response codes,
//! - the idempotent disposal contract.
//!
//! Roles compose an `Endpoint` (usually behind an `Arc`) and own the
//! sockets themselves. Disposal fires [`Endpoint::closed`]; every
//! supervisor created through [`Endpoint::child_supervisor`] is
//! cancelled with it, so loops holding socket halves exit and the
//! sockets close.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use rps_core::{Message, ResponseCode};
use rps_protocol::{
    decode_message, drain_frames, encode_to_vec, ProtocolError, MAX_FRAME_SIZE, RECV_BUFFER_SIZE,
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::supervisor::TaskSupervisor;

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct Endpoint {
    name: String,
    tasks: TaskSupervisor,
    closed: CancellationToken,
    disposed: AtomicBool,
}

impl Endpoint {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let closed = CancellationToken::new();
        let tasks = TaskSupervisor::with_parent(format!("{}/run", name), closed.clone());

        Self {
            name,
            tasks,
            closed,
            disposed: AtomicBool::new(false),
        }
    }

    /// Display name used as the log prefix (the local identity).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Launch the role's run loop under this endpoint's supervisor.
    pub fn start<F, Fut>(&self, run: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.tasks.start("run", run);
    }

    /// A supervisor for the role's own connection loops, torn down
    /// together with this endpoint.
    pub fn child_supervisor(&self, label: &str) -> TaskSupervisor {
        TaskSupervisor::with_parent(format!("{}/{}", self.name, label), self.closed.clone())
    }

    /// Fires once the endpoint is disposed.
    pub fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Encode `msg` and write all of it to `writer`.
    pub async fn send_message<W>(&self, writer: &mut W, msg: &Message) -> Result<(), EndpointError>
    where
        W: AsyncWrite + Unpin,
    {
        let bytes = encode_to_vec(msg)?;
        writer.write_all(&bytes).await?;
        writer.flush().await?;

        debug!("{} sent message: \"{}\"", self.name, msg);
        Ok(())
    }

    /// Wait for the next message on `reader`.
    ///
    /// Reads chunks of at most [`RECV_BUFFER_SIZE`] bytes until a full
    /// frame is buffered. `None` means the connection is gone: the
    /// read was cancelled, the peer closed, the transport failed, or a
    /// frame did not decode.
    pub async fn receive_message<R>(
        &self,
        reader: &mut FramedReader<R>,
        cancel: &CancellationToken,
    ) -> Option<Message>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            if let Some(msg) = reader.ready.pop_front() {
                return Some(msg);
            }

            let mut chunk = [0u8; RECV_BUFFER_SIZE];
            let n = tokio::select! {
                _ = cancel.cancelled() => return None,
                read = reader.inner.read(&mut chunk) => match read {
                    Ok(n) => n,
                    Err(e) => {
                        debug!("{} lost connection: {}", self.name, e);
                        return None;
                    }
                },
            };

            if n == 0 {
                debug!("{}: peer closed the connection", self.name);
                return None;
            }

            reader.buffer.extend_from_slice(&chunk[..n]);
            for frame in drain_frames(&mut reader.buffer) {
                match decode_message(&frame) {
                    Ok(Some(msg)) => reader.ready.push_back(msg),
                    Ok(None) => {}
                    Err(e) => {
                        warn!("{} dropped an undecodable frame: {}", self.name, e);
                        return None;
                    }
                }
            }

            if reader.buffer.len() > MAX_FRAME_SIZE {
                warn!("{}: no delimiter after {} bytes", self.name, reader.buffer.len());
                return None;
            }
        }
    }

    /// Shared handling of a just-received message.
    ///
    /// Returns whether the connection is still viable. Terminal codes
    /// dispose the endpoint.
    pub fn process_response(&self, msg: &Message) -> bool {
        let text = msg.text_or_empty();

        match msg.code {
            ResponseCode::Move => {
                info!("{} received a message: \"{}\"", self.name, text);
                true
            }
            ResponseCode::Solution => {
                info!("{} received the game's solution: \"{}\"", self.name, text);
                true
            }
            ResponseCode::Ack => {
                info!("{} received acknowledgement: \"{}\"", self.name, text);
                true
            }
            ResponseCode::Connect => {
                info!("{} got a connection request", self.name);
                true
            }
            ResponseCode::End => {
                info!("{} communication ended: \"{}\"", self.name, text);
                self.dispose();
                false
            }
            ResponseCode::Refused => {
                info!("{} was refused: \"{}\"", self.name, text);
                self.dispose();
                false
            }
            ResponseCode::Unknown => {
                warn!("{} received an unknown code: \"{}\"", self.name, text);
                self.dispose();
                false
            }
        }
    }

    /// Cancel the run loop and signal the owner to close its sockets.
    ///
    /// Idempotent and safe to call from any task or signal handler.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.tasks.dispose();
        self.closed.cancel();
        debug!("{} disposed", self.name);
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Read half of a connection plus the bytes and messages received on
/// it but not handed out yet.
#[derive(Debug)]
pub struct FramedReader<R> {
    inner: R,
    buffer: Vec<u8>,
    ready: VecDeque<Message>,
}

impl<R> FramedReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: Vec::with_capacity(RECV_BUFFER_SIZE),
            ready: VecDeque::new(),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Orderly shutdown of the write side; errors mean the peer is
/// already gone and are ignored.
pub async fn shutdown_stream<W>(writer: &mut W)
where
    W: AsyncWrite + Unpin,
{
    let _ = writer.shutdown().await;
}
