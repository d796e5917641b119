//! Shared types for the game server.
//!
//! This module defines:
//! - `ConnectionId`: a lightweight handle for accepted connections
//! - `RoundEntry`: per-player round state
//! - `Pairing`: the moves a delivered solution was computed from
//! - the concurrent containers shared between player loops

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::{DashMap, DashSet};

/// Identifier for an accepted connection.
///
/// Unique over the lifetime of the process, so a loop can tell its own
/// entry apart from a later connection that registered the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

/// Per-player round state, keyed by player name in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundEntry {
    /// Connection that owns this entry.
    pub connection: ConnectionId,

    /// Remote end of that connection.
    pub peer: SocketAddr,

    /// Move submitted for the current round; empty means none yet.
    pub pending_move: String,

    /// Set once the current round's solution was sent to this player.
    pub solved: Option<Pairing>,

    /// Move that arrived after the solution was sent; it becomes the
    /// pending move once the round resets.
    pub next_move: Option<String>,

    /// Rounds this player has completed.
    pub round: u64,
}

impl RoundEntry {
    pub fn new(connection: ConnectionId, peer: SocketAddr, round: u64) -> Self {
        Self {
            connection,
            peer,
            pending_move: String::new(),
            solved: None,
            next_move: None,
            round,
        }
    }

    pub fn has_move(&self) -> bool {
        !self.pending_move.is_empty()
    }

    pub fn solution_delivered(&self) -> bool {
        self.solved.is_some()
    }

    /// The solution sent to this player was computed against `opponent`.
    pub fn solved_against(&self, opponent: ConnectionId) -> Option<&Pairing> {
        self.solved.as_ref().filter(|p| p.opponent == opponent)
    }
}

/// Which opponent and which two moves a delivered solution was
/// computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub opponent: ConnectionId,
    /// This player's move.
    pub mine: String,
    /// The opponent's move.
    pub theirs: String,
}

/// Registered players and their round state.
pub type PlayerRegistry = Arc<DashMap<String, RoundEntry>>;

/// Players the server owes an `ACK`.
pub type PendingAcks = Arc<DashSet<String>>;
