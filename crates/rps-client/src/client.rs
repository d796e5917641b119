// crates/rps-client/src/client.rs

//! Client role: handshake, then one loop sending moves and one loop
//! receiving server messages.
//!
//! The two loops coordinate through a `watch` cell ([`Gate`]) instead
//! of shared flags: the outbound loop sleeps until a move is buffered
//! and the previous one was acknowledged, the inbound loop re-opens the
//! gate when the `ACK` arrives.

use std::sync::Arc;

use anyhow::Result;
use rps_core::{Message, ResponseCode};
use rps_net::{shutdown_stream, CancellationToken, Endpoint, FramedReader, TaskSupervisor};
use rps_protocol::wire_types::contains_delimiter;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Every message received from the server after the handshake.
pub type ClientEvents = mpsc::UnboundedReceiver<Message>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake not finished yet.
    Connecting,
    /// Server answered the handshake with `ACK`.
    Established,
    /// Server answered with anything else.
    Refused,
    /// Connection failed or ended.
    Closed,
}

/// Send gate shared by the two loops.
///
/// The outbound loop takes `pending` when it sends, so an `ACK` only
/// re-opens the gate. A move typed while the last one is unacknowledged
/// stays queued and goes out after the `ACK`; it is never discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Gate {
    /// Move waiting to be sent.
    pending: Option<String>,
    /// The last move sent was acknowledged.
    acknowledged: bool,
    /// Say goodbye (`END`) and stop sending.
    leaving: bool,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            pending: None,
            acknowledged: true,
            leaving: false,
        }
    }
}

impl Gate {
    fn ready(&self) -> bool {
        self.leaving || (self.pending.is_some() && self.acknowledged)
    }
}

/// A player's connection to the game server.
#[derive(Debug)]
pub struct GameClient {
    endpoint: Arc<Endpoint>,
    listeners: Arc<TaskSupervisor>,
    gate: Arc<watch::Sender<Gate>>,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl GameClient {
    /// Start connecting in the background.
    ///
    /// Use [`GameClient::wait_established`] for the outcome of the
    /// handshake. Must be called from within a tokio runtime.
    pub fn start(config: ClientConfig) -> (GameClient, ClientEvents) {
        let endpoint = Arc::new(Endpoint::new(config.player_name.clone()));
        let listeners = Arc::new(endpoint.child_supervisor("listeners"));
        let gate = Arc::new(watch::channel(Gate::default()).0);
        let state = Arc::new(watch::channel(ConnectionState::Connecting).0);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let session = Session {
            config,
            endpoint: Arc::clone(&endpoint),
            listeners: Arc::clone(&listeners),
            gate: Arc::clone(&gate),
            state: Arc::clone(&state),
            events: events_tx,
        };
        endpoint.start(move |token| session.run(token));

        let client = GameClient {
            endpoint,
            listeners,
            gate,
            state,
        };
        (client, events_rx)
    }

    pub fn name(&self) -> &str {
        self.endpoint.name()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Wait for the handshake; `true` if the server accepted us.
    pub async fn wait_established(&self) -> bool {
        let mut rx = self.state.subscribe();
        let outcome = match rx.wait_for(|s| *s != ConnectionState::Connecting).await {
            Ok(state) => *state,
            Err(_) => ConnectionState::Closed,
        };
        outcome == ConnectionState::Established
    }

    /// Buffer a move; it goes out once the previous one was acknowledged.
    /// A newer move replaces one that has not been sent yet.
    pub fn send_local_move(&self, text: impl Into<String>) {
        let text = text.into();
        if contains_delimiter(&text) {
            warn!(
                "{}: move contains the message delimiter and will not decode",
                self.name()
            );
        }
        self.gate.send_modify(|gate| gate.pending = Some(text));
    }

    /// The last move sent is still waiting for its `ACK`.
    pub fn awaiting_ack(&self) -> bool {
        !self.gate.borrow().acknowledged
    }

    /// Tell the server we are leaving (`END`), then close.
    pub fn leave(&self) {
        self.gate.send_modify(|gate| gate.leaving = true);
    }

    /// Stop both loops and close the socket. Idempotent.
    pub fn dispose(&self) {
        self.listeners.dispose();
        self.endpoint.dispose();
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Refused || *state == ConnectionState::Closed {
                return false;
            }
            *state = ConnectionState::Closed;
            true
        });
    }
}

impl Drop for GameClient {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// State moved into the run loop.
struct Session {
    config: ClientConfig,
    endpoint: Arc<Endpoint>,
    listeners: Arc<TaskSupervisor>,
    gate: Arc<watch::Sender<Gate>>,
    state: Arc<watch::Sender<ConnectionState>>,
    events: mpsc::UnboundedSender<Message>,
}

impl Session {
    async fn run(self, token: CancellationToken) -> Result<()> {
        let connected = self.connect(&token).await;

        let (reader, writer) = match connected {
            Ok(Some(halves)) => halves,
            Ok(None) => {
                self.endpoint.dispose();
                return Ok(());
            }
            Err(e) => {
                self.state.send_replace(ConnectionState::Closed);
                self.endpoint.dispose();
                return Err(e.into());
            }
        };

        self.state.send_replace(ConnectionState::Established);

        let inbound = Inbound {
            endpoint: Arc::clone(&self.endpoint),
            gate: Arc::clone(&self.gate),
            state: Arc::clone(&self.state),
            events: self.events,
        };
        self.listeners
            .start("inbound", move |token| inbound.run(reader, token));

        let outbound = Outbound {
            endpoint: Arc::clone(&self.endpoint),
            gate: Arc::clone(&self.gate),
        };
        self.listeners
            .start("outbound", move |token| outbound.run(writer, token));

        Ok(())
    }

    /// Connect and shake hands. `None` when the server turned us down
    /// or the attempt was cancelled; the state is already set then.
    async fn connect(
        &self,
        token: &CancellationToken,
    ) -> Result<Option<(FramedReader<OwnedReadHalf>, OwnedWriteHalf)>, ClientError> {
        let addr = &self.config.server_addr;
        let connect_err = |source| ClientError::Connect {
            addr: addr.clone(),
            source,
        };

        let stream = tokio::select! {
            _ = token.cancelled() => {
                self.state.send_replace(ConnectionState::Closed);
                return Ok(None);
            }
            connected = TcpStream::connect(addr) => connected.map_err(connect_err)?,
        };
        stream.set_nodelay(true).map_err(connect_err)?;
        info!("{} connected to server {}", self.endpoint.name(), addr);

        let (reader, mut writer) = stream.into_split();
        let mut reader = FramedReader::new(reader);

        if self.handshake(&mut reader, &mut writer, token).await? {
            Ok(Some((reader, writer)))
        } else {
            Ok(None)
        }
    }

    /// `CON` out, one answer in; only `ACK` establishes the connection.
    async fn handshake(
        &self,
        reader: &mut FramedReader<OwnedReadHalf>,
        writer: &mut OwnedWriteHalf,
        token: &CancellationToken,
    ) -> Result<bool, ClientError> {
        let name = self.endpoint.name();
        self.endpoint
            .send_message(writer, &Message::connect(name))
            .await
            .map_err(|source| ClientError::Send {
                what: "handshake",
                source,
            })?;

        match self.endpoint.receive_message(reader, token).await {
            Some(reply) if reply.code == ResponseCode::Ack => {
                info!("{} joined the game", name);
                Ok(true)
            }
            Some(reply) => {
                info!("{} was not admitted: {}", name, reply);
                self.state.send_replace(ConnectionState::Refused);
                Ok(false)
            }
            None => {
                info!("{} lost the connection during the handshake", name);
                self.state.send_replace(ConnectionState::Closed);
                Ok(false)
            }
        }
    }
}

struct Inbound {
    endpoint: Arc<Endpoint>,
    gate: Arc<watch::Sender<Gate>>,
    state: Arc<watch::Sender<ConnectionState>>,
    events: mpsc::UnboundedSender<Message>,
}

impl Inbound {
    async fn run(
        self,
        mut reader: FramedReader<OwnedReadHalf>,
        token: CancellationToken,
    ) -> Result<()> {
        info!("{} starts listening to server messages...", self.endpoint.name());

        while !token.is_cancelled() {
            let Some(msg) = self.endpoint.receive_message(&mut reader, &token).await else {
                break;
            };

            // The UI may have gone away; that does not end the connection.
            let _ = self.events.send(msg.clone());

            let viable = self.endpoint.process_response(&msg);

            if msg.code == ResponseCode::Ack {
                self.gate.send_modify(|gate| gate.acknowledged = true);
                debug!("{}: move was acknowledged", self.endpoint.name());
            }

            if !viable {
                break;
            }
        }

        self.state.send_replace(ConnectionState::Closed);
        // Connection gone: stop the outbound loop as well.
        self.endpoint.dispose();
        Ok(())
    }
}

struct Outbound {
    endpoint: Arc<Endpoint>,
    gate: Arc<watch::Sender<Gate>>,
}

impl Outbound {
    async fn run(self, mut writer: OwnedWriteHalf, token: CancellationToken) -> Result<()> {
        let name = self.endpoint.name().to_string();
        let mut gate_rx = self.gate.subscribe();

        let result = loop {
            if token.is_cancelled() {
                break Ok(());
            }

            let ready = tokio::select! {
                _ = token.cancelled() => break Ok(()),
                ready = async { gate_rx.wait_for(Gate::ready).await.map(|g| g.clone()) } => ready,
            };
            let Ok(gate) = ready else {
                break Ok(());
            };

            if gate.leaving {
                let bye = Message::end(&name);
                if let Err(e) = self.endpoint.send_message(&mut writer, &bye).await {
                    break Err(ClientError::Send {
                        what: "END",
                        source: e,
                    });
                }
                info!("{} left the game", name);
                break Ok(());
            }

            // Claim the move before sending so an early ACK cannot be lost.
            let mut claimed = None;
            self.gate.send_modify(|gate| {
                claimed = gate.pending.take();
                gate.acknowledged = false;
            });
            let Some(text) = claimed else {
                continue;
            };

            if let Err(e) = self
                .endpoint
                .send_message(&mut writer, &Message::play(&name, text))
                .await
            {
                break Err(ClientError::Send {
                    what: "move",
                    source: e,
                });
            }
        };

        shutdown_stream(&mut writer).await;
        Ok(result?)
    }
}
