//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Binds the configured endpoint (keep-alive on, fixed backlog).
//! - Accepts connections one at a time.
//! - Runs the `CON` handshake and the capacity check.
//! - Starts the inbound/outbound loops for every admitted player.
//!
//! The per-player logic lives in `player`, the round state machine in
//! `round`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rps_core::Message;
use rps_net::{shutdown_stream, CancellationToken, Endpoint, FramedReader, TaskSupervisor};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::player::{self, PlayerContext};
use crate::registry::RoundRegistry;
use crate::types::{ConnectionId, RoundEntry};

/// Global-ish counter for assigning unique `ConnectionId`s.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

fn next_connection_id() -> ConnectionId {
    ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
}

/// The two-player game server.
#[derive(Debug)]
pub struct GameServer {
    config: ServerConfig,
    endpoint: Arc<Endpoint>,
    players: Arc<TaskSupervisor>,
    registry: RoundRegistry,
    listener: Mutex<Option<TcpListener>>,
    local_addr: Option<SocketAddr>,
}

impl GameServer {
    /// Create the server and bind its listener.
    ///
    /// A bind failure is logged and leaves the server in a
    /// non-listening state instead of failing. Must be called from
    /// within a tokio runtime.
    pub fn bind(config: ServerConfig) -> Self {
        let endpoint = Arc::new(Endpoint::new(config.server_name.clone()));
        let players = Arc::new(endpoint.child_supervisor("players"));
        let registry = RoundRegistry::new(config.max_players);

        let listener = match open_listener(&config) {
            Ok(listener) => {
                info!("[Server] Server started successfully.");
                Some(listener)
            }
            Err(ServerError::AddressInUse(addr)) => {
                warn!(
                    "[Server] The endpoint {} is already in use. \
                     A server might already be running.",
                    addr
                );
                None
            }
            Err(e) => {
                error!("[Server] An error occurred: {}", e);
                None
            }
        };
        let local_addr = listener.as_ref().and_then(|l| l.local_addr().ok());

        Self {
            config,
            endpoint,
            players,
            registry,
            listener: Mutex::new(listener),
            local_addr,
        }
    }

    /// Start the accept loop. Does nothing if the server is not
    /// listening or was already started.
    pub fn start(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        let Some(listener) = listener else {
            warn!("[Server] Not listening; accept loop not started.");
            return;
        };

        let acceptor = Acceptor {
            endpoint: Arc::clone(&self.endpoint),
            players: Arc::clone(&self.players),
            registry: self.registry.clone(),
            config: self.config.clone(),
        };
        self.endpoint
            .start(move |token| acceptor.run(listener, token));
    }

    /// Bound and not disposed.
    pub fn is_listening(&self) -> bool {
        self.local_addr.is_some() && !self.endpoint.is_disposed()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn player_count(&self) -> usize {
        self.registry.player_count()
    }

    pub fn round_entry(&self, name: &str) -> Option<RoundEntry> {
        self.registry.entry(name)
    }

    /// Stop accepting, cancel every player loop, close all sockets.
    /// Idempotent.
    pub fn dispose(&self) {
        self.players.dispose();
        self.endpoint.dispose();
        // Listener never handed to an accept loop.
        drop(self.listener.lock().unwrap_or_else(|e| e.into_inner()).take());
    }
}

impl Drop for GameServer {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn open_listener(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr_str = config.socket_addr_string();
    let addr: SocketAddr = addr_str
        .parse()
        .map_err(|_| ServerError::InvalidAddress(addr_str.clone()))?;

    let bind_err = |source: std::io::Error| {
        if source.kind() == std::io::ErrorKind::AddrInUse {
            ServerError::AddressInUse(addr_str.clone())
        } else {
            ServerError::Bind {
                addr: addr_str.clone(),
                source,
            }
        }
    };

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4().map_err(bind_err)?
    } else {
        TcpSocket::new_v6().map_err(bind_err)?
    };

    socket.set_keepalive(true).map_err(bind_err)?;
    socket.bind(addr).map_err(bind_err)?;
    socket.listen(config.backlog).map_err(bind_err)
}

/// State moved into the accept loop.
struct Acceptor {
    endpoint: Arc<Endpoint>,
    players: Arc<TaskSupervisor>,
    registry: RoundRegistry,
    config: ServerConfig,
}

impl Acceptor {
    async fn run(self, listener: TcpListener, token: CancellationToken) -> anyhow::Result<()> {
        while !token.is_cancelled() {
            let (stream, peer) = tokio::select! {
                _ = token.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("[Server] accept failed: {}", e);
                        continue;
                    }
                },
            };

            info!("[Server] A new client wants to connect from {}", peer);
            self.handshake(stream, peer, &token).await;
        }

        info!("[Server] Accept loop stopped.");
        Ok(())
    }

    async fn handshake(&self, stream: TcpStream, peer: SocketAddr, token: &CancellationToken) {
        let (reader, mut writer) = stream.into_split();
        let mut reader = FramedReader::new(reader);

        let opening = tokio::time::timeout(
            self.config.handshake_timeout,
            self.endpoint.receive_message(&mut reader, token),
        )
        .await;

        let opening = match opening {
            Ok(Some(opening)) => opening,
            Ok(None) => {
                info!("[Server] {} left before the handshake", peer);
                return;
            }
            Err(_) => {
                warn!("[Server] {} sent no handshake in time, dropping it", peer);
                return;
            }
        };

        let connection_id = next_connection_id();
        let admission = self.registry.admit(&opening, connection_id, peer);

        let reply = match &admission {
            Ok(_) => Message::ack(&self.config.server_name),
            Err(_) => Message::refuse(&self.config.server_name),
        };

        if let Err(e) = self.endpoint.send_message(&mut writer, &reply).await {
            warn!("[Server] Could not answer the handshake of {}: {}", peer, e);
            if let Ok(name) = &admission {
                self.registry.unregister(name, connection_id);
            }
            return;
        }

        let name = match admission {
            Ok(name) => name,
            Err(refusal) => {
                shutdown_stream(&mut writer).await;
                info!(
                    "[Server] Rejected the connection of {}: {}",
                    opening.player_name.as_deref().unwrap_or("<unnamed>"),
                    refusal
                );
                return;
            }
        };

        info!("[Server] {} joined the game ({})", name, peer);

        let ctx = PlayerContext {
            name,
            connection_id,
            endpoint: Arc::clone(&self.endpoint),
            registry: self.registry.clone(),
            connection: self.players.child_token(),
            poll_interval: self.config.poll_interval,
            server_name: self.config.server_name.clone(),
        };

        let inbound = ctx.clone();
        self.players
            .start("inbound", move |_group| player::run_inbound(inbound, reader));
        self.players
            .start("outbound", move |_group| player::run_outbound(ctx, writer));
    }
}
