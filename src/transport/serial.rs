//! Serial transport implementation.
//!
//! The panel talks 19200 baud, 8 data bits, no parity, one stop bit and no
//! handshake.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream,
    StopBits,
};

use crate::error::{Error, Result};
use crate::transport::{INBOUND_CHANNEL_CAPACITY, Transport};

/// Default baud rate for the panel.
pub const DEFAULT_BAUD_RATE: u32 = 19_200;

/// Configuration for serial transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "COM3").
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    /// Handshake mode.
    pub flow_control: FlowControl,
}

impl SerialConfig {
    /// Creates a new serial configuration with the panel's line settings.
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }

    /// Sets the baud rate.
    #[must_use]
    pub const fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = rate;
        self
    }

    /// Sets the handshake mode.
    #[must_use]
    pub const fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }
}

/// Serial transport for the panel.
///
/// The read half is driven by a background task that forwards raw chunks to
/// the receiver returned from [`Transport::open`].
pub struct SerialTransport {
    config: SerialConfig,
    writer: Option<WriteHalf<SerialStream>>,
    read_task: Option<JoinHandle<()>>,
    alive: Arc<AtomicBool>,
}

impl SerialTransport {
    /// Creates a new serial transport with the given configuration.
    #[must_use]
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            writer: None,
            read_task: None,
            alive: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a new serial transport for the given port with default settings.
    #[must_use]
    pub fn with_port(port: impl Into<String>) -> Self {
        Self::new(SerialConfig::new(port))
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn release(&mut self) {
        if let Some(task) = self.read_task.take() {
            task.abort();
        }
        self.writer = None;
        self.alive.store(false, Ordering::Release);
    }
}

/// Forwards raw chunks from the port until it closes or the receiver drops.
async fn run_read_loop(
    mut reader: ReadHalf<SerialStream>,
    bytes_tx: mpsc::Sender<Bytes>,
) -> Result<()> {
    let mut buf = [0u8; 256];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                tracing::debug!("serial port closed");
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "serial port closed",
                )));
            }
            Ok(n) => n,
            Err(e) => return Err(Error::Io(e)),
        };

        tracing::trace!("received {} bytes", n);
        if bytes_tx.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
            tracing::debug!("byte receiver dropped");
            return Ok(());
        }
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Bytes>>> + Send + '_>> {
        Box::pin(async move {
            self.release();

            tracing::info!("opening serial port: {}", self.config.port);

            let stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
                .data_bits(self.config.data_bits)
                .parity(self.config.parity)
                .stop_bits(self.config.stop_bits)
                .flow_control(self.config.flow_control)
                .open_native_async()
                .map_err(|source| Error::Open {
                    port: self.config.port.clone(),
                    source,
                })?;

            // Drop whatever the device sent before we were listening
            if let Err(e) = stream.clear(ClearBuffer::Input) {
                tracing::warn!("failed to clear input buffer: {}", e);
            }

            let (reader, writer) = tokio::io::split(stream);
            let (bytes_tx, bytes_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);

            let alive = Arc::new(AtomicBool::new(true));
            let task_alive = Arc::clone(&alive);
            self.read_task = Some(tokio::spawn(async move {
                if let Err(e) = run_read_loop(reader, bytes_tx).await {
                    tracing::error!("serial read error: {}", e);
                }
                task_alive.store(false, Ordering::Release);
            }));
            self.writer = Some(writer);
            self.alive = alive;

            tracing::info!("opened serial port");
            Ok(bytes_rx)
        })
    }

    fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if self.writer.is_some() {
                tracing::info!("closing serial port: {}", self.config.port);
            }
            self.release();
        })
    }

    fn write(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let writer = self.writer.as_mut().ok_or(Error::NotConnected)?;

            tracing::trace!("writing {} bytes", data.len());
            writer.write_all(&data).await?;
            writer.flush().await?;

            Ok(())
        })
    }

    fn is_alive(&self) -> bool {
        self.writer.is_some() && self.alive.load(Ordering::Acquire)
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.release();
    }
}
