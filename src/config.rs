// src/config.rs
//! Tracker configuration with file-backed storage

use crate::error::{GpsError, Result};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_BAUDRATE: u32 = 9600;
pub const DEFAULT_HISTORY_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub port: String,
    pub baudrate: u32,
    /// Upper bound on a single transport read; also bounds stop latency
    #[serde(rename = "read_timeout_ms", with = "millis")]
    pub read_timeout: Duration,
    pub history_size: usize,
    /// How long `stop()` waits for the reader before aborting it
    #[serde(rename = "stop_timeout_ms", with = "millis")]
    pub stop_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            port: Self::platform_default_port().to_string(),
            baudrate: DEFAULT_BAUDRATE,
            read_timeout: Duration::from_secs(1),
            history_size: DEFAULT_HISTORY_SIZE,
            stop_timeout: Duration::from_secs(2),
        }
    }
}

impl TrackerConfig {
    pub fn new(port: impl Into<String>, baudrate: u32) -> Self {
        Self {
            port: port.into(),
            baudrate,
            ..Self::default()
        }
    }

    fn platform_default_port() -> &'static str {
        #[cfg(windows)]
        {
            "COM3"
        }

        #[cfg(not(windows))]
        {
            "/dev/ttyUSB0"
        }
    }

    /// Reject settings the tracker cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(GpsError::Config("serial port must not be empty".to_string()));
        }
        if self.baudrate == 0 {
            return Err(GpsError::Config("baud rate must be positive".to_string()));
        }
        if self.read_timeout.is_zero() {
            return Err(GpsError::Config("read timeout must be positive".to_string()));
        }
        if self.stop_timeout.is_zero() {
            return Err(GpsError::Config("stop timeout must be positive".to_string()));
        }
        if self.history_size == 0 {
            return Err(GpsError::Config("history size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GpsError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            GpsError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        Ok(config)
    }

    /// Save to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// `$HOME/.config/gps-tracker/config.json` (`%USERPROFILE%` on Windows)
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| GpsError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("gps-tracker").join("config.json"))
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.baudrate, 9600);
        assert_eq!(config.history_size, 1000);
        assert_eq!(config.read_timeout, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = TrackerConfig::new("/dev/ttyUSB0", 0);
        assert!(matches!(config.validate(), Err(GpsError::Config(_))));

        config.baudrate = 4800;
        config.history_size = 0;
        assert!(matches!(config.validate(), Err(GpsError::Config(_))));

        config.history_size = 10;
        config.read_timeout = Duration::ZERO;
        assert!(matches!(config.validate(), Err(GpsError::Config(_))));

        config.read_timeout = Duration::from_millis(100);
        config.port = "  ".to_string();
        assert!(matches!(config.validate(), Err(GpsError::Config(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrackerConfig =
            serde_json::from_str(r#"{"port":"COM7","read_timeout_ms":250}"#).unwrap();
        assert_eq!(config.port, "COM7");
        assert_eq!(config.read_timeout, Duration::from_millis(250));
        assert_eq!(config.baudrate, DEFAULT_BAUDRATE);
        assert_eq!(config.stop_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = TrackerConfig::new("/dev/ttyS1", 38400);
        config.history_size = 42;
        config.save_to(&path).unwrap();

        let loaded = TrackerConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_from_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(TrackerConfig::load_from(&path), Err(GpsError::Config(_))));
    }
}
