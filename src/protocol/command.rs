//! Outbound commands for the panel.
//!
//! Commands are the decimal brightness followed by the end marker, with no
//! start marker: `42#`. The device does not acknowledge them.

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::frame::END_MARKER;
use crate::types::Brightness;

/// Commands sent to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Light the panel at the given level.
    SetBrightness(Brightness),
    /// Switch the panel off (sent as brightness zero).
    Off,
}

impl Command {
    /// Returns the brightness this command puts on the wire.
    #[must_use]
    pub const fn level(&self) -> Brightness {
        match self {
            Self::SetBrightness(level) => *level,
            Self::Off => Brightness::ZERO,
        }
    }

    /// Encodes the command into its wire form.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let digits = self.level().get().to_string();
        let mut buf = BytesMut::with_capacity(digits.len() + 1);
        buf.put_slice(digits.as_bytes());
        buf.put_u8(END_MARKER);
        buf.freeze()
    }
}
