//! # SDS011 Protocol Constants and Types
//!
//! Core protocol definitions for SDS011 serial communication.

/// Frame head byte (always 0xAA)
pub const SDS011_HEAD_BYTE: u8 = 0xAA;

/// Frame tail byte (always 0xAB)
pub const SDS011_TAIL_BYTE: u8 = 0xAB;

/// Command id of a measurement data frame sent by the sensor
pub const SDS011_CMD_DATA: u8 = 0xC0;

/// Command id of a host-to-sensor command frame
pub const SDS011_CMD_QUERY: u8 = 0xB4;

/// Sub-command: set working period
pub const SDS011_SUBCMD_WORKING_PERIOD: u8 = 0x08;

/// Working period mode byte: write (0x00 would query)
pub const SDS011_MODE_SET: u8 = 0x01;

/// Measurement data frame size
/// Frame structure: head(1) + cmd(1) + pm25(2) + pm10(2) + id(2) + checksum(1) + tail(1)
pub const SDS011_DATA_FRAME_SIZE: usize = 10;

/// Command data bytes covered by the checksum before the device id
pub const SDS011_COMMAND_DATA_SIZE: usize = 13;

/// Device id addressing every sensor on the bus
pub const SDS011_BROADCAST_ID: [u8; 2] = [0xFF, 0xFF];

/// Longest supported working period in minutes (0 = continuous)
pub const SDS011_MAX_PERIOD_MINUTES: u8 = 30;

/// Serial baud rate of the sensor
pub const SDS011_BAUD_RATE: u32 = 9600;

/// Raw PM values are transmitted in tenths of µg/m³
pub const SDS011_PM_SCALE: f64 = 10.0;

/// A decoded PM2.5 / PM10 pair in µg/m³
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PmReading {
    /// PM2.5 concentration
    pub pm25: f64,

    /// PM10 concentration
    pub pm10: f64,
}

impl PmReading {
    /// Build a reading from the raw little-endian serial values
    pub fn from_raw(pm25_raw: u16, pm10_raw: u16) -> Self {
        Self {
            pm25: pm25_raw as f64 / SDS011_PM_SCALE,
            pm10: pm10_raw as f64 / SDS011_PM_SCALE,
        }
    }

    /// Format the reading as a log record line (newline terminated)
    ///
    /// Values always carry one decimal so the line matches the record
    /// pattern even for whole numbers.
    ///
    /// # Examples
    ///
    /// ```
    /// use sds011_logger::sds011::protocol::PmReading;
    ///
    /// let line = PmReading::from_raw(300, 328).to_line();
    /// assert_eq!(line, "ug/m3 PM2.5=30.0, PM10=32.8\n");
    /// ```
    pub fn to_line(&self) -> String {
        format!("ug/m3 PM2.5={:.1}, PM10={:.1}\n", self.pm25, self.pm10)
    }
}
