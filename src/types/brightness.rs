//! Brightness levels.

use std::fmt;

use crate::error::Error;

/// Highest brightness the panel accepts.
pub const MAX_BRIGHTNESS: u8 = 100;

/// A brightness level validated against `0..=MAX_BRIGHTNESS`.
///
/// Out-of-range requests are rejected rather than clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Brightness(u8);

impl Brightness {
    /// Panel dark.
    pub const ZERO: Self = Self(0);

    /// Full illumination.
    pub const MAX: Self = Self(MAX_BRIGHTNESS);

    /// Creates a brightness level, returning `None` when above the maximum.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value > MAX_BRIGHTNESS {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Returns the raw level.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i32> for Brightness {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(Error::InvalidValue { value })
    }
}

impl From<Brightness> for u8 {
    fn from(level: Brightness) -> Self {
        level.0
    }
}

impl From<Brightness> for u16 {
    fn from(level: Brightness) -> Self {
        Self::from(level.0)
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
