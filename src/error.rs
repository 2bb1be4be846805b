//! Error types for the flatpanel library.

use thiserror::Error;

/// The main error type for flatpanel operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The serial port could not be opened.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested brightness is outside `0..=MAX_BRIGHTNESS`.
    #[error("invalid brightness {value}: must be between 0 and 100")]
    InvalidValue { value: i32 },

    /// Connection is not established.
    #[error("not connected")]
    NotConnected,

    /// The panel has no hardware for this operation.
    #[error("{operation} is not implemented")]
    NotImplemented { operation: String },

    /// Settings could not be read or written.
    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),

    /// Channel receive error.
    #[error("channel closed")]
    ChannelClosed,
}

impl Error {
    pub(crate) fn not_implemented(operation: impl Into<String>) -> Self {
        Self::NotImplemented {
            operation: operation.into(),
        }
    }
}

/// Reasons an inbound frame is rejected as corrupt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// End marker arrived with nothing between the markers.
    #[error("corrupt frame: empty payload")]
    Empty,

    /// Payload holds more digits than the protocol allows.
    #[error("corrupt frame: payload of {0} bytes exceeds 3 digits")]
    TooLong(usize),

    /// Payload has the right length but is not a decimal numeral.
    #[error("corrupt frame: payload {0:?} is not numeric")]
    NotNumeric(String),
}

/// Result type alias for flatpanel operations.
pub type Result<T> = std::result::Result<T, Error>;
