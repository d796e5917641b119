//! Moves and the winner rule.

use std::str::FromStr;

use crate::error::GameError;

/// One of the three hand shapes.
///
/// The wire carries the German tokens (`Stein`, `Papier`, `Schere`);
/// the English names are accepted as case-insensitive aliases.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    /// Canonical wire token.
    pub fn as_token(self) -> &'static str {
        match self {
            Move::Rock => "Stein",
            Move::Paper => "Papier",
            Move::Scissors => "Schere",
        }
    }

    /// Parse a token, returning `None` for anything unrecognised.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim() {
            "Stein" => Some(Move::Rock),
            "Papier" => Some(Move::Paper),
            "Schere" => Some(Move::Scissors),
            other => match other.to_ascii_lowercase().as_str() {
                "rock" => Some(Move::Rock),
                "paper" => Some(Move::Paper),
                "scissors" => Some(Move::Scissors),
                _ => None,
            },
        }
    }

    /// Cyclic dominance: rock > scissors > paper > rock.
    pub fn beats(self, other: Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissors)
                | (Move::Scissors, Move::Paper)
                | (Move::Paper, Move::Rock)
        )
    }
}

impl FromStr for Move {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Move::from_token(s).ok_or_else(|| GameError::UnknownMove(s.to_string()))
    }
}

/// Result of a round from one player's point of view.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Lose,
    Draw,
}

impl Outcome {
    /// Text shipped in the `SOL` message.
    pub fn text(self) -> &'static str {
        match self {
            Outcome::Win => "You Win!",
            Outcome::Lose => "You Lose!",
            Outcome::Draw => "That's a draw!",
        }
    }

    /// Same round, seen from the opponent's side.
    pub fn reversed(self) -> Self {
        match self {
            Outcome::Win => Outcome::Lose,
            Outcome::Lose => Outcome::Win,
            Outcome::Draw => Outcome::Draw,
        }
    }
}

/// Decide a round between `mine` and `theirs`, from `mine`'s side.
///
/// Identical tokens are a draw even when neither is a known move;
/// every other pair that is not two known moves is
/// [`GameError::InvalidMove`].
pub fn find_winner(mine: &str, theirs: &str) -> Result<Outcome, GameError> {
    match (Move::from_token(mine), Move::from_token(theirs)) {
        (Some(a), Some(b)) if a == b => Ok(Outcome::Draw),
        (Some(a), Some(b)) if a.beats(b) => Ok(Outcome::Win),
        (Some(_), Some(_)) => Ok(Outcome::Lose),
        _ if mine == theirs => Ok(Outcome::Draw),
        _ => Err(GameError::InvalidMove {
            first: mine.to_string(),
            second: theirs.to_string(),
        }),
    }
}
