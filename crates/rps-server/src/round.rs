//! Round synchronization state machine.
//!
//! Every poll, a player's outbound loop takes a [`RoundView`] snapshot
//! of the registry and asks [`decide`] what to do next. The checks run
//! in a fixed priority order:
//!
//! 1. an `ACK` is owed                        -> [`RoundStep::SendAck`]
//! 2. fewer than two players                  -> [`RoundStep::WaitForOpponent`]
//! 3. a move for this round is missing        -> [`RoundStep::WaitForInputs`]
//! 4. we got the result, the opponent did not -> [`RoundStep::WaitForOpponentToReceive`]
//! 5. both got the result                     -> [`RoundStep::ResetRound`]
//! 6. otherwise                               -> [`RoundStep::DeliverSolution`]
//!
//! A new round can only start for a player once both players were sent
//! the previous result. The first player to reset moves one round
//! ahead; for the other player that counts as "result received", and a
//! player who is one round behind counts as "no move yet". This keeps a
//! move left over from the previous round out of the next one.
//!
//! A delivered result remembers the opponent connection and both moves
//! it was computed from ([`Pairing`]). A result computed against someone
//! else is stale: its owner discards it and the other side treats that
//! player as having no move yet. Once one side got its result, the other
//! side is scored from the same pairing, so both results always agree.

use crate::types::{ConnectionId, Pairing, RoundEntry};

/// What a player's outbound loop sees on one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundView {
    /// This player's entry, if still registered.
    pub own: Option<RoundEntry>,
    /// Some other registered player.
    pub opponent: Option<(String, RoundEntry)>,
    /// Number of registered players.
    pub players: usize,
    /// The server owes this player an `ACK`.
    pub ack_pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundStep {
    /// The entry is gone or belongs to another connection: stop.
    Gone,
    SendAck,
    /// `clear_stale` is set when we still hold a result from a round
    /// against a player who has left.
    WaitForOpponent { clear_stale: bool },
    /// We hold a result computed against a previous opponent.
    DiscardStaleSolution,
    WaitForInputs,
    WaitForOpponentToReceive,
    ResetRound,
    DeliverSolution { opponent: String, pairing: Pairing },
}

impl RoundStep {
    /// Short description for logs.
    pub fn label(&self) -> &'static str {
        match self {
            RoundStep::Gone => "gone",
            RoundStep::SendAck => "sending ack",
            RoundStep::WaitForOpponent { .. } => "waiting for other player",
            RoundStep::DiscardStaleSolution => "dropping the result of a previous opponent",
            RoundStep::WaitForInputs => "waiting for both inputs",
            RoundStep::WaitForOpponentToReceive => "waiting for other to receive solution",
            RoundStep::ResetRound => "both received the solution, starting a new round",
            RoundStep::DeliverSolution { .. } => "sending solution",
        }
    }
}

pub fn decide(connection: ConnectionId, view: &RoundView) -> RoundStep {
    let own = match &view.own {
        Some(own) if own.connection == connection => own,
        _ => return RoundStep::Gone,
    };

    if view.ack_pending {
        return RoundStep::SendAck;
    }

    let (opponent, theirs) = match &view.opponent {
        Some((name, entry)) if view.players >= 2 => (name, entry),
        _ => {
            return RoundStep::WaitForOpponent {
                clear_stale: own.solution_delivered(),
            }
        }
    };

    if own.solution_delivered() && own.solved_against(theirs.connection).is_none() {
        return RoundStep::DiscardStaleSolution;
    }

    let their_result = theirs.solved_against(connection);
    let theirs_stale = theirs.solution_delivered() && their_result.is_none();
    let opponent_behind = theirs.round < own.round;
    let opponent_ahead = theirs.round > own.round;

    if theirs_stale || opponent_behind {
        return RoundStep::WaitForInputs;
    }

    if own.solution_delivered() {
        return if their_result.is_some() || opponent_ahead {
            RoundStep::ResetRound
        } else {
            RoundStep::WaitForOpponentToReceive
        };
    }

    // Only a player whose result was delivered can have moved on.
    if opponent_ahead {
        return RoundStep::WaitForInputs;
    }

    let pairing = match their_result {
        Some(result) => Pairing {
            opponent: theirs.connection,
            mine: result.theirs.clone(),
            theirs: result.mine.clone(),
        },
        None if own.has_move() && theirs.has_move() => Pairing {
            opponent: theirs.connection,
            mine: own.pending_move.clone(),
            theirs: theirs.pending_move.clone(),
        },
        None => return RoundStep::WaitForInputs,
    };

    RoundStep::DeliverSolution {
        opponent: opponent.clone(),
        pairing,
    }
}
