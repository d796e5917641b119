//! rps-protocol
//!
//! Wire-level encoding/decoding for the game server.
//!
//! This crate turns logical messages (`rps_core::Message`) into bytes
//! and back again.
//!
//! - [`wire_types`] : delimiter and buffer constants
//! - [`json_codec`] : JSON encoding of a single message
//! - [`framing`]    : splitting a byte stream on the delimiter

pub mod framing;
pub mod json_codec;
pub mod wire_types;

pub use framing::drain_frames;
pub use json_codec::{decode_message, encode_message, encode_to_vec, ProtocolError};
pub use wire_types::{DELIMITER, MAX_FRAME_SIZE, RECV_BUFFER_SIZE};
