//! In-process transport.
//!
//! [`MemoryTransport`] stands in for a serial port; its paired
//! [`MemoryDevice`] plays the panel: it pushes status bytes to the client,
//! records the commands written to it, and can be unplugged or made absent.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::{Bytes, BytesMut};
use tokio::sync::{Mutex, mpsc};

use crate::error::{Error, Result};
use crate::transport::{INBOUND_CHANNEL_CAPACITY, Transport};

/// Port name reported in open errors.
pub const MEMORY_PORT: &str = "memory";

#[derive(Debug)]
struct Shared {
    inbound: Mutex<Option<mpsc::Sender<Bytes>>>,
    written: Mutex<BytesMut>,
    open: AtomicBool,
    present: AtomicBool,
    opens: AtomicUsize,
}

/// Client side of an in-memory link.
#[derive(Debug)]
pub struct MemoryTransport {
    shared: Arc<Shared>,
}

/// Device side of an in-memory link.
#[derive(Debug, Clone)]
pub struct MemoryDevice {
    shared: Arc<Shared>,
}

impl MemoryTransport {
    /// Creates a connected transport/device pair.
    #[must_use]
    pub fn pair() -> (Self, MemoryDevice) {
        let shared = Arc::new(Shared {
            inbound: Mutex::new(None),
            written: Mutex::new(BytesMut::new()),
            open: AtomicBool::new(false),
            present: AtomicBool::new(true),
            opens: AtomicUsize::new(0),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            MemoryDevice { shared },
        )
    }
}

impl MemoryDevice {
    /// Sends raw bytes to the client as if they came off the wire.
    pub async fn send(&self, data: impl Into<Bytes>) -> Result<()> {
        let tx = self
            .shared
            .inbound
            .lock()
            .await
            .clone()
            .ok_or(Error::NotConnected)?;
        tx.send(data.into()).await.map_err(|_| Error::ChannelClosed)
    }

    /// Returns every byte written by the client so far.
    pub async fn written(&self) -> Bytes {
        self.shared.written.lock().await.clone().freeze()
    }

    /// Returns and forgets the bytes written by the client so far.
    pub async fn take_written(&self) -> Bytes {
        self.shared.written.lock().await.split().freeze()
    }

    /// Simulates the cable being pulled: the link dies without a close.
    pub async fn unplug(&self) {
        self.shared.open.store(false, Ordering::Release);
        self.shared.inbound.lock().await.take();
    }

    /// Controls whether the next open finds a device.
    pub fn set_present(&self, present: bool) {
        self.shared.present.store(present, Ordering::Release);
    }

    /// Returns how many times the link has been opened.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.shared.opens.load(Ordering::Acquire)
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Bytes>>> + Send + '_>> {
        Box::pin(async move {
            if !self.shared.present.load(Ordering::Acquire) {
                return Err(Error::Open {
                    port: MEMORY_PORT.into(),
                    source: tokio_serial::Error::new(
                        tokio_serial::ErrorKind::NoDevice,
                        "no device attached",
                    ),
                });
            }

            let (tx, rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
            *self.shared.inbound.lock().await = Some(tx);
            self.shared.open.store(true, Ordering::Release);
            self.shared.opens.fetch_add(1, Ordering::AcqRel);
            Ok(rx)
        })
    }

    fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            self.shared.open.store(false, Ordering::Release);
            self.shared.inbound.lock().await.take();
        })
    }

    fn write(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if !self.is_alive() {
                return Err(Error::NotConnected);
            }
            self.shared.written.lock().await.extend_from_slice(&data);
            Ok(())
        })
    }

    fn is_alive(&self) -> bool {
        self.shared.open.load(Ordering::Acquire)
    }
}
