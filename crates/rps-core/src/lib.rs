//! rps-core
//!
//! Pure game logic:
//! - messages and response codes
//! - moves and the winner rule

pub mod error;
pub mod messages;
pub mod moves;

pub use error::GameError;
pub use messages::{Message, ResponseCode};
pub use moves::{find_winner, Move, Outcome};
