//! # SDS011 Logger Library
//!
//! Record particulate-matter readings from a Nova Fitness SDS011 sensor.
//!
//! This library provides the serial frame decoder, the append-only reading
//! log with startup replay, and the bounded in-memory series served to
//! clients.

pub mod config;
pub mod error;
pub mod clock;
pub mod sds011;
pub mod serial;
pub mod telemetry;
pub mod ingest;
pub mod server;
