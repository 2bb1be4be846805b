//! In-memory model of the panel.
//!
//! [`DeviceState`] is the single source of truth for what callers are told.
//! It is shared between the command path and the decoder task behind one
//! `tokio::sync::Mutex` owned by the client.

use crate::error::{Error, Result};
use crate::protocol::Command;
use crate::types::{Brightness, ConnectionState, DeviceStatus};

/// Brightness, on/off flag and connectivity of the panel.
///
/// Commands are validated strictly while values reported by the device are
/// stored as received, even outside `0..=MAX_BRIGHTNESS`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceState {
    connection: ConnectionState,
    brightness: u16,
    on: bool,
}

impl DeviceState {
    /// Creates a disconnected state with brightness zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters the connected state with session values reset.
    pub fn mark_connected(&mut self) {
        self.reset();
        self.connection = ConnectionState::Connected;
    }

    /// Enters the disconnected state, dropping the session values.
    pub fn mark_disconnected(&mut self) {
        self.reset();
        self.connection = ConnectionState::Disconnected;
    }

    fn reset(&mut self) {
        self.brightness = 0;
        self.on = false;
    }

    /// Stores a brightness reported by the device.
    pub fn apply_decoded_brightness(&mut self, value: u16) {
        self.brightness = value;
    }

    /// Validates a brightness request and records it optimistically.
    ///
    /// On success the panel is marked on and the returned command should be
    /// written to the device. On failure nothing changes.
    pub fn request_set_brightness(&mut self, value: i32) -> Result<Command> {
        self.require_connected()?;
        let level = Brightness::try_from(value)?;
        self.brightness = level.into();
        self.on = true;
        Ok(Command::SetBrightness(level))
    }

    /// Records the panel as off at brightness zero.
    pub fn request_off(&mut self) -> Result<Command> {
        self.require_connected()?;
        self.brightness = 0;
        self.on = false;
        Ok(Command::Off)
    }

    /// Returns the calibrator status derived from connectivity and the on flag.
    #[must_use]
    pub const fn current_status(&self) -> DeviceStatus {
        match (self.connection, self.on) {
            (ConnectionState::Disconnected, _) => DeviceStatus::NotReady,
            (ConnectionState::Connected, false) => DeviceStatus::Off,
            (ConnectionState::Connected, true) => DeviceStatus::Ready,
        }
    }

    /// Returns the last known brightness.
    pub fn current_brightness(&self) -> Result<u16> {
        self.require_connected()?;
        Ok(self.brightness)
    }

    /// Returns the connection state.
    #[must_use]
    pub const fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    fn require_connected(&self) -> Result<()> {
        if self.connection.is_connected() {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }
}
