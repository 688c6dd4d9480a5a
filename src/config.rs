//! Configuration for the input watcher.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default aw-server port.
pub const DEFAULT_PORT: u16 = 5600;

/// aw-server port used in testing mode.
pub const TESTING_PORT: u16 = 5666;

/// Main configuration for the watcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds without input before the user counts as AFK
    pub timeout: f64,

    /// Seconds between polls of the aggregators
    pub poll_time: f64,

    /// Host of the aw-server instance
    pub host: String,

    /// Port of the aw-server instance; derived from `testing` when unset
    pub port: Option<u16>,

    /// Report to the testing server
    pub testing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: 180.0,
            poll_time: 5.0,
            host: "127.0.0.1".to_string(),
            port: None,
            testing: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when missing.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("activitywatch")
            .join("aw-watcher-input")
            .join("config.json")
    }

    /// The port to report to.
    pub fn server_port(&self) -> u16 {
        match self.port {
            Some(port) => port,
            None if self.testing => TESTING_PORT,
            None => DEFAULT_PORT,
        }
    }

    /// Validated polling settings.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        Settings::new(self.timeout, self.poll_time)
    }
}

/// Validated timing settings for the poll loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    timeout: f64,
    poll_time: f64,
}

impl Settings {
    /// Both values are in seconds. The AFK timeout cannot be shorter than the
    /// polling granularity.
    pub fn new(timeout: f64, poll_time: f64) -> Result<Self, ConfigError> {
        if !(poll_time.is_finite() && poll_time > 0.0) {
            return Err(ConfigError::InvalidSettings(format!(
                "poll_time must be a positive number of seconds, got {poll_time}"
            )));
        }
        if !timeout.is_finite() {
            return Err(ConfigError::InvalidSettings(format!(
                "timeout must be a finite number of seconds, got {timeout}"
            )));
        }
        if timeout < poll_time {
            return Err(ConfigError::InvalidSettings(format!(
                "timeout ({timeout}s) must not be shorter than poll_time ({poll_time}s)"
            )));
        }
        Ok(Self { timeout, poll_time })
    }

    pub fn timeout(&self) -> f64 {
        self.timeout
    }

    pub fn poll_time(&self) -> f64 {
        self.poll_time
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_time)
    }

    /// Coalescing window for heartbeats: consecutive samples closer than this
    /// belong to the same activity span.
    pub fn pulsetime(&self) -> f64 {
        self.timeout + self.poll_time
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    InvalidSettings(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::InvalidSettings(e) => write!(f, "Invalid settings: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("aw-watcher-input-test-{}-{name}", std::process::id()))
            .join("config.json")
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timeout, 180.0);
        assert_eq!(config.poll_time, 5.0);
        assert_eq!(config.server_port(), DEFAULT_PORT);
        assert!(config.settings().is_ok());
    }

    #[test]
    fn test_testing_port() {
        let config = Config {
            testing: true,
            ..Default::default()
        };
        assert_eq!(config.server_port(), TESTING_PORT);

        let config = Config {
            testing: true,
            port: Some(1234),
            ..Default::default()
        };
        assert_eq!(config.server_port(), 1234);
    }

    #[test]
    fn test_timeout_shorter_than_poll_time_is_rejected() {
        let err = Settings::new(1.0, 5.0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSettings(_)));
    }

    #[test]
    fn test_non_positive_poll_time_is_rejected() {
        assert!(Settings::new(10.0, 0.0).is_err());
        assert!(Settings::new(10.0, -1.0).is_err());
        assert!(Settings::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_pulsetime_is_timeout_plus_poll_time() {
        let settings = Settings::new(180.0, 5.0).unwrap();
        assert_eq!(settings.pulsetime(), 185.0);
        assert_eq!(settings.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_equal_timeout_and_poll_time_is_allowed() {
        assert!(Settings::new(5.0, 5.0).is_ok());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = temp_config_path("roundtrip");
        let config = Config {
            timeout: 60.0,
            poll_time: 2.0,
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let path = temp_config_path("partial");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"poll_time": 1.0}"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.poll_time, 1.0);
        assert_eq!(loaded.timeout, 180.0);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = temp_config_path("missing");
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }
}
