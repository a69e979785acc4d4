//! # Log File Naming
//!
//! Persistent logs are named `sds011_<creation ms>.dat` and replayed in
//! order of that embedded timestamp.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// File name prefix of a persistent log
pub const LOG_FILE_PREFIX: &str = "sds011_";

/// File name extension of a persistent log
pub const LOG_FILE_SUFFIX: &str = ".dat";

/// A persistent log file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    /// Creation timestamp embedded in the name (ms since epoch)
    pub timestamp: i64,

    /// Full path of the file
    pub path: PathBuf,
}

/// Build the file name for a log created at `timestamp`
///
/// # Examples
///
/// ```
/// use sds011_logger::telemetry::log_file::log_file_name;
///
/// assert_eq!(log_file_name(1700000000123), "sds011_1700000000123.dat");
/// ```
pub fn log_file_name(timestamp: i64) -> String {
    format!("{}{}{}", LOG_FILE_PREFIX, timestamp, LOG_FILE_SUFFIX)
}

/// Extract the creation timestamp from a log file name
///
/// Returns `None` for names that do not follow the convention.
pub fn parse_log_file_name(name: &str) -> Option<i64> {
    let digits = name.strip_prefix(LOG_FILE_PREFIX)?.strip_suffix(LOG_FILE_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// List the persistent logs in `dir`, oldest first
///
/// Files are ordered by embedded timestamp, ties broken by name.
///
/// # Errors
///
/// Returns error if the directory cannot be read
pub fn scan_log_files<P: AsRef<Path>>(dir: P) -> Result<Vec<LogFile>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };

        match parse_log_file_name(name) {
            Some(timestamp) => files.push(LogFile {
                timestamp,
                path: entry.path(),
            }),
            None => debug!("Ignoring {}", name),
        }
    }

    files.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.path.cmp(&b.path)));
    Ok(files)
}
