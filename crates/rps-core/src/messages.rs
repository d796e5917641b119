//! Message types exchanged between players and the server.
//!
//! These are **transport-agnostic** logical messages. The JSON shape
//! (field tags `Text`, `PlayerName`, `Code`) is fixed by the serde
//! attributes below; framing and byte encoding live in the
//! `rps-protocol` crate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Response code carried by every [`Message`].
///
/// The code alone drives how a message is interpreted. Anything that
/// does not match one of the known three-letter codes decodes to
/// [`ResponseCode::Unknown`], which every receiver treats as terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseCode {
    /// Acknowledgement of a handshake or a submitted move.
    #[serde(rename = "ACK")]
    Ack,

    /// Graceful end of the conversation.
    #[serde(rename = "END")]
    End,

    /// Connection refused (capacity full or bad handshake).
    #[serde(rename = "REF")]
    Refused,

    /// Round solution / result text.
    #[serde(rename = "SOL")]
    Solution,

    /// A gameplay move.
    #[serde(rename = "MES")]
    Move,

    /// Connection request (handshake opener).
    #[serde(rename = "CON")]
    Connect,

    /// Anything outside the closed set above.
    #[serde(other)]
    Unknown,
}

impl ResponseCode {
    /// Three-letter wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseCode::Ack => "ACK",
            ResponseCode::End => "END",
            ResponseCode::Refused => "REF",
            ResponseCode::Solution => "SOL",
            ResponseCode::Move => "MES",
            ResponseCode::Connect => "CON",
            ResponseCode::Unknown => "???",
        }
    }

    /// Human-readable label used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            ResponseCode::Ack => "Acknowledgement",
            ResponseCode::End => "End",
            ResponseCode::Refused => "Refused",
            ResponseCode::Solution => "Solution",
            ResponseCode::Move => "Message",
            ResponseCode::Connect => "Connection",
            ResponseCode::Unknown => "Unknown",
        }
    }

    /// `END`, `REF` and unknown codes end a conversation.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ResponseCode::End | ResponseCode::Refused | ResponseCode::Unknown
        )
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of communication.
///
/// `text` and `player_name` are free-form and only ever checked for
/// presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    /// Move name, result text or free-form note.
    #[serde(default)]
    pub text: Option<String>,

    /// Identity of the sender.
    #[serde(default)]
    pub player_name: Option<String>,

    pub code: ResponseCode,
}

impl Message {
    /// Bare message with only a code.
    pub fn new(code: ResponseCode) -> Self {
        Self {
            text: None,
            player_name: None,
            code,
        }
    }

    pub fn with_player(mut self, player_name: impl Into<String>) -> Self {
        self.player_name = Some(player_name.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// `CON` handshake opener for `player_name`.
    pub fn connect(player_name: &str) -> Self {
        Self::new(ResponseCode::Connect).with_player(player_name)
    }

    /// `ACK` sent by `sender`.
    pub fn ack(sender: &str) -> Self {
        Self::new(ResponseCode::Ack).with_player(sender)
    }

    /// `REF` sent by `sender`.
    pub fn refuse(sender: &str) -> Self {
        Self::new(ResponseCode::Refused).with_player(sender)
    }

    /// `MES` carrying a move.
    pub fn play(player_name: &str, mv: impl Into<String>) -> Self {
        Self::new(ResponseCode::Move)
            .with_player(player_name)
            .with_text(mv)
    }

    /// `SOL` carrying the round result text.
    pub fn solution(sender: &str, text: impl Into<String>) -> Self {
        Self::new(ResponseCode::Solution)
            .with_player(sender)
            .with_text(text)
    }

    /// `END` from `player_name`.
    pub fn end(player_name: &str) -> Self {
        Self::new(ResponseCode::End).with_player(player_name)
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Text: '{}', Player: '{}', Code: {}]",
            self.text_or_empty(),
            self.player_name.as_deref().unwrap_or(""),
            self.code.label()
        )
    }
}
