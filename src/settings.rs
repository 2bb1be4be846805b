//! Persisted driver settings.
//!
//! Settings are stored as JSON. They are read once at startup and written
//! back only when the user confirms a change.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transport::SerialConfig;

/// Default serial port.
#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM1";

/// Default serial port.
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// User-configurable settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Serial port identifier.
    pub port: String,
    /// Enables per-frame and per-command diagnostic logging.
    pub trace_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.into(),
            trace_enabled: false,
        }
    }
}

impl Settings {
    /// Loads settings from `path`, falling back to defaults if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("no settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes settings to `path`, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Builds the serial configuration for the stored port.
    #[must_use]
    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig::new(self.port.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(!settings.trace_enabled);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            port: "COM7".into(),
            trace_enabled: true,
        };

        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "trace_enabled": true }"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.port, DEFAULT_PORT);
        assert!(settings.trace_enabled);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(Settings::load(&path), Err(Error::Settings(_))));
    }

    #[test]
    fn test_serial_config_uses_port() {
        let settings = Settings {
            port: "/dev/ttyACM0".into(),
            trace_enabled: false,
        };
        let config = settings.serial_config();
        assert_eq!(config.port, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 19_200);
    }
}
