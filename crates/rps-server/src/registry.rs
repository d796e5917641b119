//! Player registry shared by every player loop.
//!
//! All mutation goes through per-key atomic updates on the underlying
//! `DashMap`; each update re-checks that the entry still belongs to the
//! calling connection. No lock is ever held across an `.await`.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use rps_core::{Message, ResponseCode};

use crate::error::ServerError;
use crate::round::RoundView;
use crate::types::{ConnectionId, Pairing, PendingAcks, PlayerRegistry, RoundEntry};

/// Why a handshake was turned down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    /// The opening message was not `CON`.
    NotAHandshake(ResponseCode),
    /// `CON` without a player name.
    MissingName,
    /// A player with this name is already registered.
    DuplicateName(String),
    /// Capacity reached.
    Full,
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Refusal::NotAHandshake(code) => write!(f, "opened with {} instead of CON", code),
            Refusal::MissingName => write!(f, "no player name given"),
            Refusal::DuplicateName(name) => write!(f, "'{}' is already playing", name),
            Refusal::Full => write!(f, "the game is full"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoundRegistry {
    players: PlayerRegistry,
    pending_acks: PendingAcks,
    max_players: usize,
}

impl RoundRegistry {
    pub fn new(max_players: usize) -> Self {
        Self {
            players: Arc::new(DashMap::new()),
            pending_acks: Arc::new(DashSet::new()),
            max_players,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn entry(&self, name: &str) -> Option<RoundEntry> {
        self.players.get(name).map(|e| e.value().clone())
    }

    /// Validate a handshake and register the player on success.
    ///
    /// Only the accept loop registers players, one at a time, so the
    /// capacity check cannot be raced by another registration.
    pub fn admit(
        &self,
        opening: &Message,
        connection: ConnectionId,
        peer: SocketAddr,
    ) -> Result<String, Refusal> {
        if opening.code != ResponseCode::Connect {
            return Err(Refusal::NotAHandshake(opening.code));
        }

        let name = match opening.player_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(Refusal::MissingName),
        };

        if self.players.len() >= self.max_players {
            return Err(Refusal::Full);
        }

        // Join the round the other player is on.
        let round = self.players.iter().map(|e| e.round).max().unwrap_or(0);

        match self.players.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Refusal::DuplicateName(name)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(RoundEntry::new(connection, peer, round));
                Ok(name)
            }
        }
    }

    /// Remove `name` if the entry still belongs to `connection`.
    pub fn unregister(&self, name: &str, connection: ConnectionId) -> bool {
        let removed = self
            .players
            .remove_if(name, |_, entry| entry.connection == connection)
            .is_some();
        if removed {
            self.pending_acks.remove(name);
        }
        removed
    }

    /// Store a submitted move (overwriting any previous one) and note
    /// that an `ACK` is owed.
    ///
    /// Once this round's solution went out, the move is held back for
    /// the next round instead.
    pub fn record_move(
        &self,
        name: &str,
        connection: ConnectionId,
        mv: &str,
    ) -> Result<(), ServerError> {
        self.update(name, connection, |entry| {
            if entry.solution_delivered() {
                entry.next_move = Some(mv.to_string());
            } else {
                entry.pending_move = mv.to_string();
            }
        })?;
        self.pending_acks.insert(name.to_string());
        Ok(())
    }

    pub fn ack_pending(&self, name: &str) -> bool {
        self.pending_acks.contains(name)
    }

    pub fn clear_ack(&self, name: &str) {
        self.pending_acks.remove(name);
    }

    /// Record that the solution for `pairing` was sent.
    ///
    /// A move that arrived while the solution was being computed or sent
    /// is held for the next round; the round keeps the move it was
    /// scored with.
    pub fn mark_delivered(
        &self,
        name: &str,
        connection: ConnectionId,
        pairing: Pairing,
    ) -> Result<(), ServerError> {
        self.update(name, connection, |entry| {
            if entry.pending_move != pairing.mine {
                let late = std::mem::replace(&mut entry.pending_move, pairing.mine.clone());
                if !late.is_empty() {
                    entry.next_move = Some(late);
                }
            }
            entry.solved = Some(pairing);
        })
    }

    /// Clear the board for the next round.
    pub fn reset_round(&self, name: &str, connection: ConnectionId) -> Result<(), ServerError> {
        self.update(name, connection, |entry| {
            if entry.solved.take().is_some() {
                entry.pending_move = entry.next_move.take().unwrap_or_default();
                entry.round += 1;
            }
        })
    }

    /// Drop a result that was computed against a player who has left.
    pub fn clear_stale_solution(
        &self,
        name: &str,
        connection: ConnectionId,
    ) -> Result<(), ServerError> {
        self.update(name, connection, |entry| {
            if entry.solved.take().is_some() {
                entry.pending_move = entry.next_move.take().unwrap_or_default();
            }
        })
    }

    /// Snapshot of everything the round state machine looks at.
    pub fn view(&self, name: &str) -> RoundView {
        let mut view = RoundView {
            ack_pending: self.ack_pending(name),
            ..RoundView::default()
        };

        for item in self.players.iter() {
            view.players += 1;
            if item.key() == name {
                view.own = Some(item.value().clone());
            } else if view.opponent.is_none() {
                view.opponent = Some((item.key().clone(), item.value().clone()));
            }
        }

        view
    }

    fn update(
        &self,
        name: &str,
        connection: ConnectionId,
        f: impl FnOnce(&mut RoundEntry),
    ) -> Result<(), ServerError> {
        match self.players.get_mut(name) {
            Some(mut entry) if entry.connection == connection => {
                f(entry.value_mut());
                Ok(())
            }
            _ => Err(ServerError::UnknownPlayer(name.to_string())),
        }
    }
}
