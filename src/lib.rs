//! # flatpanel
//!
//! A Rust client library for single-channel flat-panel calibrators.
//!
//! The panel is driven over a serial link: brightness commands go out as
//! `<level>#` and the device streams its brightness back as `$<level>#`.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Chunk-agnostic decoding of the inbound status stream
//! - Locally cached brightness and on/off status
//! - Persisted settings
//!
//! ## Quick Start
//!
//! ```no_run
//! use flatpanel::FlatPanel;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), flatpanel::Error> {
//!     let mut panel = FlatPanel::serial("/dev/ttyUSB0");
//!     panel.connect().await?;
//!
//!     panel.turn_on(60).await?;
//!     println!("Status: {:?}", panel.status().await);
//!     println!("Brightness: {}", panel.brightness().await?);
//!
//!     panel.turn_off().await?;
//!     panel.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`protocol`] - Inbound frame decoding and outbound command encoding
//! - [`types`] - Brightness and status types
//! - [`state`] - The cached device model
//! - [`transport`] - Serial and in-memory transports
//! - [`event`] - Async notifications
//! - [`settings`] - Persisted configuration
//! - [`client`] - High-level [`FlatPanel`] client

pub mod client;
pub mod error;
pub mod event;
pub mod protocol;
pub mod settings;
pub mod state;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::FlatPanel;
pub use error::{Error, FrameError, Result};
pub use event::{Event, EventDispatcher, Subscription};
pub use protocol::{Command, FrameDecoder};
pub use settings::Settings;
pub use state::DeviceState;
pub use transport::{MemoryDevice, MemoryTransport, SerialConfig, SerialTransport, Transport};
pub use types::{Brightness, ConnectionState, CoverStatus, DeviceStatus, MAX_BRIGHTNESS};
