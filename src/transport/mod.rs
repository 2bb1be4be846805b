//! Transport layer for panel communication.
//!
//! A transport owns one byte channel to one device. Opening it yields the
//! receiving end of a bounded channel carrying inbound byte chunks; there is
//! exactly one such receiver per open, so inbound data has a single consumer.

pub mod memory;
pub mod serial;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;

/// Capacity of the inbound byte channel.
pub const INBOUND_CHANNEL_CAPACITY: usize = 64;

/// Trait for transport implementations.
pub trait Transport: Send + Sync {
    /// Opens the channel and returns the receiver for inbound bytes.
    ///
    /// Bytes buffered before the open are discarded.
    fn open(&mut self) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Bytes>>> + Send + '_>>;

    /// Releases the channel. Always succeeds.
    fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    /// Writes data to the device without waiting for any reply.
    fn write(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Returns true while the channel is open and writable.
    fn is_alive(&self) -> bool;
}

pub use memory::{MemoryDevice, MemoryTransport};
pub use serial::{SerialConfig, SerialTransport};
