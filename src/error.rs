//! # Error Types
//!
//! Custom error types for the SDS011 logger using `thiserror`.

use thiserror::Error;

/// Main error type for the SDS011 logger
#[derive(Debug, Error)]
pub enum Sds011Error {
    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration value out of its valid range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Working period outside the sensor's supported range
    #[error("Working period must be in [0, 30] minutes, got {0}")]
    InvalidPeriod(u8),

    /// A `ts=` marker or log file name went backwards in time
    #[error("Timestamp regression: {found} is older than {previous}")]
    TimestampRegression {
        /// Last accepted timestamp (ms)
        previous: i64,
        /// Offending timestamp (ms)
        found: i64,
    },

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No serial device could be opened
    #[error("No SDS011 device found (tried: {0})")]
    SerialPortNotFound(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the SDS011 logger
pub type Result<T> = std::result::Result<T, Sds011Error>;
