//! Splitting a byte stream into delimiter-terminated frames.
//!
//! A receiver appends every chunk it reads to a buffer and drains the
//! complete frames out of it; a trailing partial frame stays in the
//! buffer until the rest arrives.

use crate::wire_types::DELIMITER;

/// Remove and return every complete frame (delimiter included) at the
/// front of `buffer`.
pub fn drain_frames(buffer: &mut Vec<u8>) -> Vec<Vec<u8>> {
    let delimiter = DELIMITER.as_bytes();
    let mut frames = Vec::new();

    while let Some(pos) = find(buffer, delimiter) {
        frames.push(buffer.drain(..pos + delimiter.len()).collect());
    }

    frames
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
