//! Control channel wire protocol
//!
//! Every message is a length-prefixed frame:
//!
//! ```text
//! [10-byte unsigned little-endian payload length][UTF-8 payload]
//! ```
//!
//! A payload is a command batch: one or more commands joined by `;`.
//! Decoding is lossy, so malformed UTF-8 becomes U+FFFD and never fails.
//!
//! Reserved payloads:
//! - [`HANDSHAKE_TOKEN`]: first frame of a client that wants to stay connected
//! - [`DISCONNECT`]: closes the sender's connection
//! - [`EXIT_WORDS`]: terminates the playback session

use crate::{Error, Result};

/// Width of the length prefix in bytes.
pub const LENGTH_PREFIX_LEN: usize = 10;

/// Maximum accepted payload size (16 MB).
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Sentinel sent as the first frame by clients that want a persistent connection.
pub const HANDSHAKE_TOKEN: &str = "i_want_to_live_please_don't_die";

/// Closes the connection that sent it.
pub const DISCONNECT: &str = "disconnect";

/// Commands that end the playback session.
pub const EXIT_WORDS: [&str; 2] = ["exit", "quit"];

/// Separator between commands inside one batch.
pub const COMMAND_SEPARATOR: &str = ";";

/// Encode a command batch into a wire frame.
pub fn encode_frame(command_batch: &str) -> Vec<u8> {
    let payload = command_batch.as_bytes();
    let mut buf = Vec::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    buf.extend_from_slice(&encode_length(payload.len()));
    buf.extend_from_slice(payload);
    buf
}

/// Decode a frame payload into a command batch, replacing invalid UTF-8.
pub fn decode_payload(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Encode a payload length as the 10-byte little-endian prefix.
pub fn encode_length(len: usize) -> [u8; LENGTH_PREFIX_LEN] {
    let mut prefix = [0u8; LENGTH_PREFIX_LEN];
    prefix[..8].copy_from_slice(&(len as u64).to_le_bytes());
    prefix
}

/// Decode the 10-byte little-endian length prefix.
///
/// # Errors
///
/// Fails when the length does not fit in 64 bits or exceeds [`MAX_FRAME_LEN`].
pub fn decode_length(prefix: &[u8; LENGTH_PREFIX_LEN]) -> Result<usize> {
    if prefix[8..].iter().any(|&b| b != 0) {
        return Err(Error::Protocol("frame length exceeds 64 bits".to_string()));
    }

    let mut low = [0u8; 8];
    low.copy_from_slice(&prefix[..8]);
    let len = u64::from_le_bytes(low);

    if len > MAX_FRAME_LEN as u64 {
        return Err(Error::Protocol(format!(
            "frame too large: {} bytes (max {})",
            len, MAX_FRAME_LEN
        )));
    }

    Ok(len as usize)
}

/// Split a command batch into its trimmed, non-empty commands.
pub fn split_batch(batch: &str) -> Vec<&str> {
    batch
        .split(COMMAND_SEPARATOR)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect()
}

/// True if the command asks the playback session to terminate.
pub fn is_exit_command(command: &str) -> bool {
    EXIT_WORDS.contains(&command.trim())
}

/// Incremental frame decoder that handles partial reads.
///
/// Bytes from the socket are fed in as they arrive; every complete payload is
/// returned in order and any trailing partial frame stays buffered.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    /// Create a new decoder with empty buffer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feed bytes into the decoder and extract all complete payloads.
    ///
    /// # Errors
    ///
    /// Returns an error if a length prefix is invalid. The decoder should be
    /// discarded afterwards since the stream can no longer be resynchronised.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        self.buf.extend_from_slice(bytes);
        let mut payloads = Vec::new();

        loop {
            if self.buf.len() < LENGTH_PREFIX_LEN {
                break;
            }

            let mut prefix = [0u8; LENGTH_PREFIX_LEN];
            prefix.copy_from_slice(&self.buf[..LENGTH_PREFIX_LEN]);
            let len = decode_length(&prefix)?;

            let total = LENGTH_PREFIX_LEN + len;
            if self.buf.len() < total {
                break; // more bytes pending
            }

            payloads.push(decode_payload(&self.buf[LENGTH_PREFIX_LEN..total]));
            self.buf.drain(..total);
        }

        Ok(payloads)
    }

    /// Returns true if the decoder has buffered partial data.
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty()
    }
}
