//! Error types for the game core.
//!
//! The core API is infallible except where player input has to be
//! interpreted as a move.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// A single token that is not one of the known moves.
    #[error("unknown move: {0:?}")]
    UnknownMove(String),

    /// A pair of moves the winner rule cannot decide.
    #[error("invalid input: cannot decide {first:?} against {second:?}")]
    InvalidMove { first: String, second: String },
}
