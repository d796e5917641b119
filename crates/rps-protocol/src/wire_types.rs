//! Low-level wire constants.
//!
//! The actual encode/decode logic lives in `json_codec`.

/// End-of-message marker appended to every encoded message.
///
/// Payloads are not escaped: a text that itself contains this
/// sequence will corrupt framing.
pub const DELIMITER: &str = "<|EOM|>";

/// Size of a single receive chunk.
pub const RECV_BUFFER_SIZE: usize = 1024;

/// Upper bound for a frame still waiting for its delimiter.
pub const MAX_FRAME_SIZE: usize = 16 * RECV_BUFFER_SIZE;

/// Does `text` contain the delimiter (and so break framing)?
pub fn contains_delimiter(text: &str) -> bool {
    text.contains(DELIMITER)
}
