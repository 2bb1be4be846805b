//! Device status types.

/// Calibrator status reported to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeviceStatus {
    /// Not connected.
    #[default]
    NotReady,
    /// Connected and switched off.
    Off,
    /// Connected and switched on. Brightness may still be zero.
    Ready,
}

/// Transport connection state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    /// Returns true if connected.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Cover state. The panel has no cover, so this is always `NotPresent`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CoverStatus {
    #[default]
    NotPresent,
}
