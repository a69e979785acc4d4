//! # Telemetry Module
//!
//! Handles reading history: persistent logs and the in-memory series.
//!
//! This module handles:
//! - Splitting incoming text into lines (bounded buffer)
//! - Parsing reading records and `ts=` resync markers
//! - Writing the append-only `sds011_<ts>.dat` log
//! - Replaying historic logs on startup
//! - Keeping the last 30 days of readings in memory for queries

pub mod line_buffer;
pub mod series;
pub mod log_file;
pub mod decoder;
