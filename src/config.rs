//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{Result, Sds011Error};
use crate::sds011::protocol::{SDS011_BAUD_RATE, SDS011_MAX_PERIOD_MINUTES};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Read from the sensor at all (false = serve history only)
    #[serde(default = "default_serial_enabled")]
    pub enabled: bool,

    /// Device path; empty means auto-detect
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_warmup_ms")]
    pub warmup_ms: u64,

    #[serde(default = "default_read_timeout_s")]
    pub read_timeout_s: u64,
}

/// Sensor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SensorConfig {
    /// Working period in minutes (0 = continuous, about 1 Hz)
    #[serde(default = "default_period_minutes")]
    pub period_minutes: u8,
}

/// Persistent log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

/// Query server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_server_enabled")]
    pub enabled: bool,

    #[serde(default = "default_listen")]
    pub listen: String,
}

/// Diagnostic logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Optional file receiving a copy of the diagnostic log
    #[serde(default)]
    pub file: Option<String>,
}

// Default value functions
fn default_serial_enabled() -> bool { true }
fn default_baud_rate() -> u32 { SDS011_BAUD_RATE }
fn default_warmup_ms() -> u64 { 4000 }
fn default_read_timeout_s() -> u64 { 30 * 60 }

fn default_period_minutes() -> u8 { 0 }

fn default_log_dir() -> String { ".".to_string() }

fn default_server_enabled() -> bool { true }
fn default_listen() -> String { "0.0.0.0:8081".to_string() }

fn default_log_level() -> String { "info".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enabled: default_serial_enabled(),
            port: String::new(),
            baud_rate: default_baud_rate(),
            warmup_ms: default_warmup_ms(),
            read_timeout_s: default_read_timeout_s(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self { period_minutes: default_period_minutes() }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { log_dir: default_log_dir() }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_server_enabled(),
            listen: default_listen(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sds011_logger::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Query server bind address
    ///
    /// # Errors
    ///
    /// Returns error if `server.listen` is not a socket address
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.server.listen.parse().map_err(|e| {
            Sds011Error::InvalidConfig(format!("listen address '{}': {}", self.server.listen, e))
        })
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range. An
    /// out-of-range working period is reported as `InvalidPeriod`.
    pub fn validate(&self) -> Result<()> {
        if self.sensor.period_minutes > SDS011_MAX_PERIOD_MINUTES {
            return Err(Sds011Error::InvalidPeriod(self.sensor.period_minutes));
        }

        if self.serial.baud_rate == 0 {
            return Err(Sds011Error::InvalidConfig(
                "baud_rate must be greater than 0".to_string(),
            ));
        }

        if self.serial.warmup_ms > 60_000 {
            return Err(Sds011Error::InvalidConfig(
                "warmup_ms must be between 0 and 60000".to_string(),
            ));
        }

        if self.serial.read_timeout_s == 0 {
            return Err(Sds011Error::InvalidConfig(
                "read_timeout_s must be greater than 0".to_string(),
            ));
        }

        if self.storage.log_dir.is_empty() {
            return Err(Sds011Error::InvalidConfig(
                "storage log_dir cannot be empty".to_string(),
            ));
        }

        if self.server.enabled {
            self.listen_addr()?;
        }

        if let Some(file) = &self.logging.file {
            if file.is_empty() {
                return Err(Sds011Error::InvalidConfig(
                    "logging file cannot be empty when set".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.validate().is_ok());
        assert!(config.serial.enabled);
        assert!(config.serial.port.is_empty());
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.warmup_ms, 4000);
        assert_eq!(config.serial.read_timeout_s, 1800);
        assert_eq!(config.sensor.period_minutes, 0);
        assert_eq!(config.storage.log_dir, ".");
        assert_eq!(config.server.listen, "0.0.0.0:8081");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.serial.baud_rate, 9600);
        assert!(config.server.enabled);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyUSB1"

[sensor]
period_minutes = 5

[storage]
log_dir = "/var/lib/sds011"

[server]
listen = "127.0.0.1:9000"

[logging]
level = "debug"
file = "/tmp/sds011.log"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB1");
        assert_eq!(config.sensor.period_minutes, 5);
        assert_eq!(config.storage.log_dir, "/var/lib/sds011");
        assert_eq!(config.listen_addr().unwrap().port(), 9000);
        assert_eq!(config.logging.file.as_deref(), Some("/tmp/sds011.log"));
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml")).unwrap();
        assert_eq!(config.sensor.period_minutes, 0);
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_period_out_of_range() {
        let mut config = Config::default();
        config.sensor.period_minutes = 31;
        assert!(matches!(config.validate(), Err(Sds011Error::InvalidPeriod(31))));

        config.sensor.period_minutes = 30;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_period_rejected_by_parser() {
        let result = Config::parse("[sensor]\nperiod_minutes = -1\n");
        assert!(matches!(result, Err(Sds011Error::Config(_))));
    }

    #[test]
    fn test_zero_baud_rate() {
        let mut config = Config::default();
        config.serial.baud_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_read_timeout() {
        let mut config = Config::default();
        config.serial.read_timeout_s = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_excessive_warmup() {
        let mut config = Config::default();
        config.serial.warmup_ms = 60_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir() {
        let mut config = Config::default();
        config.storage.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_listen_address() {
        let mut config = Config::default();
        config.server.listen = "not an address".to_string();
        assert!(matches!(config.validate(), Err(Sds011Error::InvalidConfig(_))));

        // Ignored when the server is off
        config.server.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_logging_file() {
        let mut config = Config::default();
        config.logging.file = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::parse("[serial\nport = ");
        assert!(matches!(result, Err(Sds011Error::Config(_))));
    }
}
