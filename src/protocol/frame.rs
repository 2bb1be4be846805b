//! Frame decoding for the inbound status stream.
//!
//! The device reports its brightness as ASCII text:
//! ```text
//! ┌──────┬──────────────┬──────┐
//! │  $   │  1-3 digits  │  #   │
//! └──────┴──────────────┴──────┘
//! ```
//! Bytes outside a frame are noise and are skipped. Outbound commands use
//! only the end marker, see [`crate::protocol::command`].

use bytes::BytesMut;

use crate::error::FrameError;

/// Marks the start of an inbound frame.
pub const START_MARKER: u8 = b'$';

/// Marks the end of both inbound frames and outbound commands.
pub const END_MARKER: u8 = b'#';

/// Longest payload the device sends (`"100"`).
pub const MAX_PAYLOAD_DIGITS: usize = 3;

/// Byte-at-a-time decoder for `$<digits>#` frames.
///
/// The decoder is chunk-agnostic: feeding a stream one byte at a time or in
/// bursts of any size yields the same results in the same order.
///
/// A start marker seen while already inside a frame is kept as payload. The
/// frame is then rejected by the length or numeric check when its end marker
/// arrives instead of restarting on the second `$`.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
    payload_len: usize,
    framing: bool,
}

impl FrameDecoder {
    /// Creates a new frame decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(MAX_PAYLOAD_DIGITS + 1),
            payload_len: 0,
            framing: false,
        }
    }

    /// Feeds a single byte into the decoder.
    ///
    /// Returns `Ok(Some(value))` when the byte completes a valid frame,
    /// `Ok(None)` while no frame is complete, or an error when the byte
    /// completes a corrupt frame. The decoder is ready for the next start
    /// marker after any completed frame.
    ///
    /// # Errors
    ///
    /// Returns a `FrameError` if the completed payload is empty, longer than
    /// [`MAX_PAYLOAD_DIGITS`], or not a decimal numeral.
    pub fn feed_byte(&mut self, byte: u8) -> Result<Option<u16>, FrameError> {
        if !self.framing {
            if byte == START_MARKER {
                self.clear();
                self.framing = true;
            }
            return Ok(None);
        }

        if byte == END_MARKER {
            let result = self.finish();
            self.clear();
            return result.map(Some);
        }

        // Only the first bytes past the limit are kept; the length alone
        // decides a too-long frame.
        if self.buffer.len() <= MAX_PAYLOAD_DIGITS {
            self.buffer.extend_from_slice(&[byte]);
        }
        self.payload_len += 1;
        Ok(None)
    }

    /// Feeds a chunk of bytes and collects every completed frame.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Result<u16, FrameError>> {
        data.iter()
            .filter_map(|&byte| self.feed_byte(byte).transpose())
            .collect()
    }

    /// Returns true while a start marker has been seen without its end marker.
    #[must_use]
    pub const fn is_framing(&self) -> bool {
        self.framing
    }

    /// Returns the number of payload bytes received for the current frame.
    #[must_use]
    pub const fn buffered(&self) -> usize {
        self.payload_len
    }

    /// Discards any partial frame and waits for the next start marker.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.payload_len = 0;
        self.framing = false;
    }

    fn finish(&self) -> Result<u16, FrameError> {
        match self.payload_len {
            0 => Err(FrameError::Empty),
            1..=MAX_PAYLOAD_DIGITS => parse_payload(&self.buffer),
            n => Err(FrameError::TooLong(n)),
        }
    }
}

/// Parses a frame payload as an unsigned decimal numeral.
fn parse_payload(payload: &[u8]) -> Result<u16, FrameError> {
    let not_numeric = || FrameError::NotNumeric(String::from_utf8_lossy(payload).into_owned());

    if !payload.iter().all(u8::is_ascii_digit) {
        return Err(not_numeric());
    }

    std::str::from_utf8(payload)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(not_numeric)
}
