//! # SDS011 Command Encoder
//!
//! Encodes host-to-sensor command frames.

use super::checksum::checksum;
use super::protocol::*;
use crate::error::{Result, Sds011Error};

/// Encode a "set working period" command
///
/// The sensor measures once per `minutes` and sleeps in between; `0`
/// selects continuous mode (about one frame per second).
///
/// # Arguments
///
/// * `minutes` - Working period, 0-30
///
/// # Returns
///
/// * `Result<Vec<u8>>` - Complete command frame (19 bytes: head + cmd +
///   13 data bytes + 2-byte device id + checksum + tail)
///
/// # Errors
///
/// Returns `InvalidPeriod` if `minutes` exceeds 30. The value is never clamped.
///
/// # Examples
///
/// ```
/// use sds011_logger::sds011::encoder::encode_set_period;
///
/// let frame = encode_set_period(5)?;
/// assert_eq!(&frame[..5], &[0xAA, 0xB4, 0x08, 0x01, 0x05]);
/// assert_eq!(&frame[15..], &[0xFF, 0xFF, 0x0C, 0xAB]);
/// # Ok::<(), sds011_logger::error::Sds011Error>(())
/// ```
pub fn encode_set_period(minutes: u8) -> Result<Vec<u8>> {
    if minutes > SDS011_MAX_PERIOD_MINUTES {
        return Err(Sds011Error::InvalidPeriod(minutes));
    }

    let mut data = Vec::with_capacity(SDS011_COMMAND_DATA_SIZE + SDS011_BROADCAST_ID.len());
    data.extend_from_slice(&[SDS011_SUBCMD_WORKING_PERIOD, SDS011_MODE_SET, minutes]);
    data.resize(SDS011_COMMAND_DATA_SIZE, 0x00);
    data.extend_from_slice(&SDS011_BROADCAST_ID);

    Ok(encode_command_frame(&data))
}

/// Wrap command data (including device id) into a complete frame
///
/// # Arguments
///
/// * `data` - Command data followed by the 2-byte device id
///
/// # Returns
///
/// * `Vec<u8>` - `AA B4 <data> <checksum> AB`
pub fn encode_command_frame(data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(data.len() + 4);
    frame.push(SDS011_HEAD_BYTE);
    frame.push(SDS011_CMD_QUERY);
    frame.extend_from_slice(data);
    frame.push(checksum(data));
    frame.push(SDS011_TAIL_BYTE);
    frame
}
