//! JSON encoding/decoding for [`rps_core::Message`].
//!
//! Wire form of one message:
//!
//! ```text
//! {"Text":"Stein","PlayerName":"alice","Code":"MES"}<|EOM|>
//! ```
//!
//! Encoding serializes the message to JSON, appends [`DELIMITER`] and
//! emits UTF-8 bytes. Decoding strips the delimiter wherever it occurs
//! in a frame and parses what is left. Splitting a stream into frames
//! is the job of [`crate::framing`].

use rps_core::Message;
use thiserror::Error;

use crate::wire_types::DELIMITER;

/// Errors that can arise when encoding/decoding a chunk.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Chunk is not valid UTF-8.
    #[error("chunk is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// JSON could not be produced or parsed.
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a single message; the bytes are appended to `out`.
pub fn encode_message(msg: &Message, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
    serde_json::to_writer(&mut *out, msg)?;
    out.extend_from_slice(DELIMITER.as_bytes());
    Ok(())
}

/// Convenience wrapper around [`encode_message`].
pub fn encode_to_vec(msg: &Message) -> Result<Vec<u8>, ProtocolError> {
    let mut out = Vec::with_capacity(64);
    encode_message(msg, &mut out)?;
    Ok(out)
}

/// Decode one received frame.
///
/// Returns `Ok(None)` when nothing but whitespace and delimiters was
/// received (an empty read included).
pub fn decode_message(chunk: &[u8]) -> Result<Option<Message>, ProtocolError> {
    let text = std::str::from_utf8(chunk)?;
    let body = text.replace(DELIMITER, "");
    let body = body.trim();

    if body.is_empty() {
        return Ok(None);
    }

    Ok(Some(serde_json::from_str(body)?))
}
