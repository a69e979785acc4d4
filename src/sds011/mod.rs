//! # SDS011 Protocol Module
//!
//! Implementation of the Nova Fitness SDS011 serial protocol.
//!
//! This module handles:
//! - Data frame decoding (PM2.5 / PM10, 10-byte frames)
//! - Command encoding (set working period)
//! - Additive checksum calculation
//! - Frame synchronization and validation

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod checksum;
