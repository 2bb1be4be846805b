//! Main [`FlatPanel`] client implementation.
//!
//! This module provides the high-level [`FlatPanel`] client that combines
//! the transport, frame decoder and device state into one interface.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::event::{Event, EventDispatcher, Subscription};
use crate::protocol::{Command, FrameDecoder};
use crate::settings::Settings;
use crate::state::DeviceState;
use crate::transport::{SerialConfig, SerialTransport, Transport};
use crate::types::{ConnectionState, CoverStatus, DeviceStatus, MAX_BRIGHTNESS};

/// Client for a serial flat-panel calibrator.
///
/// Commands are fire-and-forget: the local state is updated as soon as a
/// command is accepted, and a later status frame from the device may
/// overwrite it.
pub struct FlatPanel<T> {
    transport: Mutex<T>,
    state: Arc<Mutex<DeviceState>>,
    dispatcher: EventDispatcher,
    diagnostics: Arc<AtomicBool>,

    // Background task
    decode_task: Option<JoinHandle<()>>,
}

impl FlatPanel<SerialTransport> {
    /// Creates a new client for a serial port.
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g., "/dev/ttyUSB0")
    ///
    /// # Returns
    ///
    /// A new client (not yet connected).
    #[must_use]
    pub fn serial(port: impl Into<String>) -> Self {
        Self::with_serial_config(SerialConfig::new(port))
    }

    /// Creates a new client with custom serial configuration.
    #[must_use]
    pub fn with_serial_config(config: SerialConfig) -> Self {
        Self::new(SerialTransport::new(config))
    }

    /// Creates a new client from persisted settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let mut client = Self::with_serial_config(settings.serial_config());
        client.set_diagnostics(settings.trace_enabled);
        client
    }
}

impl<T: Transport + 'static> FlatPanel<T> {
    /// Creates a new client with the given transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport: Mutex::new(transport),
            state: Arc::new(Mutex::new(DeviceState::new())),
            dispatcher: EventDispatcher::new(64),
            diagnostics: Arc::new(AtomicBool::new(false)),
            decode_task: None,
        }
    }

    /// Opens the link and starts decoding status frames.
    ///
    /// Connecting while already connected does nothing. If the transport
    /// fails to open, the client stays disconnected.
    pub async fn connect(&mut self) -> Result<()> {
        if self.check_link().await.is_ok() {
            return Ok(());
        }
        self.stop_decoder().await;

        let opened = self.transport.lock().await.open().await;
        let bytes_rx = match opened {
            Ok(rx) => rx,
            Err(e) => {
                tracing::error!("failed to connect: {}", e);
                self.state.lock().await.mark_disconnected();
                return Err(e);
            }
        };

        self.state.lock().await.mark_connected();
        self.start_decoder(bytes_rx);
        self.dispatcher.dispatch(Event::Connected);

        tracing::info!("connected");
        Ok(())
    }

    /// Stops decoding and closes the link. Any partial frame is dropped.
    pub async fn disconnect(&mut self) {
        self.stop_decoder().await;
        self.transport.lock().await.close().await;

        let was_connected = {
            let mut state = self.state.lock().await;
            let was_connected = state.connection_state().is_connected();
            state.mark_disconnected();
            was_connected
        };

        if was_connected {
            tracing::info!("disconnected");
            self.dispatcher.dispatch(Event::Disconnected);
        }
    }

    /// Connects or disconnects.
    pub async fn set_connected(&mut self, connected: bool) -> Result<()> {
        if connected {
            self.connect().await
        } else {
            self.disconnect().await;
            Ok(())
        }
    }

    /// Returns true if connected and the link is alive.
    pub async fn is_connected(&self) -> bool {
        self.check_link().await.is_ok()
    }

    /// Returns the connection state, accounting for a dead link.
    pub async fn connection_state(&self) -> ConnectionState {
        if self.is_connected().await {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Returns the last known brightness.
    pub async fn brightness(&self) -> Result<u16> {
        self.check_link().await?;
        self.state.lock().await.current_brightness()
    }

    /// Returns the highest brightness the panel accepts.
    #[must_use]
    pub const fn max_brightness(&self) -> u8 {
        MAX_BRIGHTNESS
    }

    /// Turns the panel on at `level`.
    ///
    /// Fails with [`Error::InvalidValue`] for levels outside `0..=100`, in
    /// which case nothing is sent and the state is unchanged.
    pub async fn turn_on(&self, level: i32) -> Result<()> {
        self.check_link().await?;
        let command = self.state.lock().await.request_set_brightness(level)?;
        self.send(command).await;
        Ok(())
    }

    /// Turns the panel off.
    pub async fn turn_off(&self) -> Result<()> {
        self.check_link().await?;
        let command = self.state.lock().await.request_off()?;
        self.send(command).await;
        Ok(())
    }

    /// Returns the calibrator status.
    pub async fn status(&self) -> DeviceStatus {
        if self.check_link().await.is_err() {
            return DeviceStatus::NotReady;
        }
        self.state.lock().await.current_status()
    }

    /// Returns the cover status. The panel has no cover.
    #[must_use]
    pub const fn cover_status(&self) -> CoverStatus {
        CoverStatus::NotPresent
    }

    pub fn open_cover(&self) -> Result<()> {
        Err(Error::not_implemented("open_cover"))
    }

    pub fn close_cover(&self) -> Result<()> {
        Err(Error::not_implemented("close_cover"))
    }

    pub fn halt_cover(&self) -> Result<()> {
        Err(Error::not_implemented("halt_cover"))
    }

    /// Returns the names of supported custom actions. There are none.
    #[must_use]
    pub const fn supported_actions(&self) -> &'static [&'static str] {
        &[]
    }

    /// Runs a custom action.
    pub fn action(&self, name: &str, _parameters: &str) -> Result<String> {
        Err(Error::not_implemented(format!("action {name:?}")))
    }

    /// Subscribes to events.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.dispatcher.subscribe()
    }

    /// Returns true if diagnostic logging is enabled.
    #[must_use]
    pub fn diagnostics(&self) -> bool {
        self.diagnostics.load(Ordering::Relaxed)
    }

    /// Enables or disables per-frame and per-command diagnostic logging.
    pub fn set_diagnostics(&mut self, enabled: bool) {
        self.diagnostics.store(enabled, Ordering::Relaxed);
    }

    /// Fails with `NotConnected` unless connected with a live link.
    ///
    /// A link that died underneath a connected client flips the state to
    /// disconnected here.
    async fn check_link(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.connection_state().is_connected() {
            return Err(Error::NotConnected);
        }
        if self.transport.lock().await.is_alive() {
            return Ok(());
        }

        tracing::warn!("link lost, marking disconnected");
        state.mark_disconnected();
        self.dispatcher.dispatch(Event::Disconnected);
        Err(Error::NotConnected)
    }

    /// Writes a command. Failures are logged, not returned.
    async fn send(&self, command: Command) {
        let frame = command.encode();
        if self.diagnostics() {
            tracing::debug!("sending {:?} as {:?}", command, frame);
        }
        if let Err(e) = self.transport.lock().await.write(frame).await {
            tracing::warn!("failed to send {:?}: {}", command, e);
        }
    }

    fn start_decoder(&mut self, bytes_rx: mpsc::Receiver<Bytes>) {
        let state = Arc::clone(&self.state);
        let dispatcher = self.dispatcher.clone();
        let diagnostics = Arc::clone(&self.diagnostics);

        self.decode_task = Some(tokio::spawn(run_decoder(
            bytes_rx,
            state,
            dispatcher,
            diagnostics,
        )));
    }

    async fn stop_decoder(&mut self) {
        if let Some(task) = self.decode_task.take() {
            task.abort();
            // Wait so no frame lands after the state is reset
            let _ = task.await;
        }
    }
}

/// Drains inbound bytes and applies decoded brightness to the state.
async fn run_decoder(
    mut bytes_rx: mpsc::Receiver<Bytes>,
    state: Arc<Mutex<DeviceState>>,
    dispatcher: EventDispatcher,
    diagnostics: Arc<AtomicBool>,
) {
    let mut decoder = FrameDecoder::new();

    while let Some(chunk) = bytes_rx.recv().await {
        for result in decoder.feed(&chunk) {
            let trace = diagnostics.load(Ordering::Relaxed);
            match result {
                Ok(level) => {
                    state.lock().await.apply_decoded_brightness(level);
                    if trace {
                        tracing::debug!("device reported brightness {}", level);
                    }
                    dispatcher.dispatch(Event::BrightnessReported { level });
                }
                Err(e) => {
                    if trace {
                        tracing::debug!("discarding frame: {}", e);
                    }
                }
            }
        }
    }

    tracing::debug!("inbound stream closed");
}

impl<T> Drop for FlatPanel<T> {
    fn drop(&mut self) {
        // Abort background task
        if let Some(task) = self.decode_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transport::{MemoryDevice, MemoryTransport};

    const WAIT: Duration = Duration::from_secs(1);

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    async fn connected() -> (FlatPanel<MemoryTransport>, MemoryDevice) {
        init_tracing();
        let (transport, device) = MemoryTransport::pair();
        let mut panel = FlatPanel::new(transport);
        panel.set_diagnostics(true);
        panel.connect().await.unwrap();
        (panel, device)
    }

    async fn next_brightness(sub: &mut Subscription) -> Option<u16> {
        match sub
            .wait_for(|e| matches!(e, Event::BrightnessReported { .. }), WAIT)
            .await
        {
            Some(Event::BrightnessReported { level }) => Some(level),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_connect_defaults() {
        let (panel, device) = connected().await;
        assert!(panel.is_connected().await);
        assert_eq!(panel.connection_state().await, ConnectionState::Connected);
        assert_eq!(panel.status().await, DeviceStatus::Off);
        assert_eq!(panel.brightness().await.unwrap(), 0);
        assert_eq!(device.open_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_twice_is_noop() {
        let (mut panel, device) = connected().await;
        panel.connect().await.unwrap();
        assert_eq!(device.open_count(), 1);
    }

    #[tokio::test]
    async fn test_status_frame_updates_brightness() {
        let (panel, device) = connected().await;
        let mut sub = panel.subscribe();

        device.send(&b"$42#"[..]).await.unwrap();

        assert_eq!(next_brightness(&mut sub).await, Some(42));
        assert_eq!(panel.brightness().await.unwrap(), 42);
        assert_eq!(panel.status().await, DeviceStatus::Off);
    }

    #[tokio::test]
    async fn test_frame_split_across_chunks() {
        let (panel, device) = connected().await;
        let mut sub = panel.subscribe();

        for chunk in [&b"$"[..], b"6", b"4", b"#"] {
            device.send(chunk).await.unwrap();
        }

        assert_eq!(next_brightness(&mut sub).await, Some(64));
    }

    #[tokio::test]
    async fn test_corrupt_frames_are_discarded() {
        let (panel, device) = connected().await;
        let mut sub = panel.subscribe();

        device.send(&b"$20#"[..]).await.unwrap();
        assert_eq!(next_brightness(&mut sub).await, Some(20));

        device.send(&b"$#$12345#$5$9#$33#"[..]).await.unwrap();
        assert_eq!(next_brightness(&mut sub).await, Some(33));
        assert!(panel.is_connected().await);
    }

    #[tokio::test]
    async fn test_turn_on_writes_command() {
        let (panel, device) = connected().await;

        panel.turn_on(57).await.unwrap();

        assert_eq!(device.take_written().await, Bytes::from_static(b"57#"));
        assert_eq!(panel.brightness().await.unwrap(), 57);
        assert_eq!(panel.status().await, DeviceStatus::Ready);
    }

    #[tokio::test]
    async fn test_turn_on_at_zero_is_ready() {
        let (panel, device) = connected().await;

        panel.turn_on(0).await.unwrap();

        assert_eq!(device.take_written().await, Bytes::from_static(b"0#"));
        assert_eq!(panel.status().await, DeviceStatus::Ready);
        assert_eq!(panel.brightness().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_level_is_rejected() {
        let (panel, device) = connected().await;
        panel.turn_on(40).await.unwrap();
        device.take_written().await;

        assert!(matches!(
            panel.turn_on(150).await,
            Err(Error::InvalidValue { value: 150 })
        ));
        assert!(matches!(
            panel.turn_on(-3).await,
            Err(Error::InvalidValue { value: -3 })
        ));

        assert!(device.written().await.is_empty());
        assert_eq!(panel.brightness().await.unwrap(), 40);
        assert_eq!(panel.status().await, DeviceStatus::Ready);
    }

    #[tokio::test]
    async fn test_turn_off_twice() {
        let (panel, device) = connected().await;
        panel.turn_on(80).await.unwrap();
        device.take_written().await;

        panel.turn_off().await.unwrap();
        panel.turn_off().await.unwrap();

        assert_eq!(device.written().await, Bytes::from_static(b"0#0#"));
        assert_eq!(panel.status().await, DeviceStatus::Off);
        assert_eq!(panel.brightness().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_commands_require_connection() {
        let (transport, device) = MemoryTransport::pair();
        let panel = FlatPanel::new(transport);

        assert!(matches!(panel.turn_on(10).await, Err(Error::NotConnected)));
        assert!(matches!(panel.turn_off().await, Err(Error::NotConnected)));
        assert!(matches!(panel.brightness().await, Err(Error::NotConnected)));
        assert_eq!(panel.status().await, DeviceStatus::NotReady);
        assert_eq!(device.open_count(), 0);
        assert!(device.written().await.is_empty());
    }

    #[tokio::test]
    async fn test_open_failure_stays_disconnected() {
        let (transport, device) = MemoryTransport::pair();
        device.set_present(false);
        let mut panel = FlatPanel::new(transport);

        assert!(matches!(panel.connect().await, Err(Error::Open { .. })));
        assert!(!panel.is_connected().await);
        assert_eq!(panel.status().await, DeviceStatus::NotReady);

        device.set_present(true);
        panel.connect().await.unwrap();
        assert!(panel.is_connected().await);
    }

    #[tokio::test]
    async fn test_unplugged_link_reads_as_disconnected() {
        let (panel, device) = connected().await;
        panel.turn_on(25).await.unwrap();
        let mut sub = panel.subscribe();

        device.unplug().await;

        assert_eq!(panel.status().await, DeviceStatus::NotReady);
        assert!(matches!(panel.brightness().await, Err(Error::NotConnected)));
        assert!(matches!(panel.turn_on(10).await, Err(Error::NotConnected)));
        assert_eq!(
            sub.wait_for(|e| *e == Event::Disconnected, WAIT).await,
            Some(Event::Disconnected)
        );
    }

    #[tokio::test]
    async fn test_reconnect_resets_state() {
        let (mut panel, device) = connected().await;
        let mut sub = panel.subscribe();
        panel.turn_on(90).await.unwrap();
        device.send(&b"$88#"[..]).await.unwrap();
        assert_eq!(next_brightness(&mut sub).await, Some(88));

        panel.disconnect().await;
        assert_eq!(panel.status().await, DeviceStatus::NotReady);
        assert!(panel.brightness().await.is_err());

        panel.connect().await.unwrap();
        assert_eq!(panel.brightness().await.unwrap(), 0);
        assert_eq!(panel.status().await, DeviceStatus::Off);
        assert_eq!(device.open_count(), 2);
    }

    #[tokio::test]
    async fn test_disconnect_drops_partial_frame() {
        let (mut panel, device) = connected().await;

        device.send(&b"$4"[..]).await.unwrap();
        panel.disconnect().await;
        panel.connect().await.unwrap();

        let mut sub = panel.subscribe();
        device.send(&b"2#$9#"[..]).await.unwrap();
        assert_eq!(next_brightness(&mut sub).await, Some(9));
    }

    #[tokio::test]
    async fn test_set_connected() {
        let (transport, _device) = MemoryTransport::pair();
        let mut panel = FlatPanel::new(transport);
        let mut sub = panel.subscribe();

        panel.set_connected(true).await.unwrap();
        assert!(panel.is_connected().await);
        panel.set_connected(false).await.unwrap();
        assert!(!panel.is_connected().await);

        assert_eq!(sub.recv().await, Some(Event::Connected));
        assert_eq!(sub.recv().await, Some(Event::Disconnected));
    }

    #[tokio::test]
    async fn test_cover_is_not_present() {
        let (panel, device) = connected().await;

        assert_eq!(panel.cover_status(), CoverStatus::NotPresent);
        assert!(matches!(
            panel.open_cover(),
            Err(Error::NotImplemented { .. })
        ));
        assert!(matches!(
            panel.close_cover(),
            Err(Error::NotImplemented { .. })
        ));
        assert!(matches!(
            panel.halt_cover(),
            Err(Error::NotImplemented { .. })
        ));
        assert!(matches!(
            panel.action("blink", ""),
            Err(Error::NotImplemented { .. })
        ));
        assert!(panel.supported_actions().is_empty());
        assert!(device.written().await.is_empty());
    }

    #[tokio::test]
    async fn test_max_brightness() {
        let (transport, _device) = MemoryTransport::pair();
        let panel = FlatPanel::new(transport);
        assert_eq!(panel.max_brightness(), 100);
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings {
            port: "/dev/ttyACM1".into(),
            trace_enabled: true,
        };
        let panel = FlatPanel::from_settings(&settings);
        assert!(panel.diagnostics());
        assert_eq!(panel.transport.blocking_lock().config().port, "/dev/ttyACM1");
    }
}
