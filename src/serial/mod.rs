//! # Serial Communication Module
//!
//! Handles serial communication with the SDS011 sensor (usually behind a
//! CH340 USB-to-serial adapter).
//!
//! This module handles:
//! - Opening the serial port at 9600 baud, 8N1
//! - Async read/write operations
//! - Sending command frames to the sensor

pub mod port_trait;

use async_trait::async_trait;
use std::io;

use crate::error::{Result, Sds011Error};
use crate::sds011::protocol::SDS011_BAUD_RATE;
use port_trait::SerialPortIO;
use tracing::{debug, info, warn};

/// Default sensor device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters (CH340 on the SDS011 kit)
    "/dev/ttyACM0", // USB CDC devices
];

/// SDS011 Serial Port Handler
pub struct SensorSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for SensorSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SensorSerial {
    /// Open the sensor, auto-detecting the device among common paths
    ///
    /// # Errors
    ///
    /// Returns error if no device could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sds011_logger::serial::SensorSerial;
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let serial = SensorSerial::open()?;
    ///     Ok(())
    /// }
    /// ```
    pub fn open() -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, SDS011_BAUD_RATE)
    }

    /// Open the sensor trying each of `paths` in turn
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Line speed (the SDS011 uses 9600)
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Successfully opened SDS011 device at {}", path);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(Sds011Error::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        use tokio_serial::SerialPortBuilderExt;

        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| Sds011Error::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait]
impl SerialPortIO for SensorSerial {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        SerialPortIO::read(&mut self.port, buf).await
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        SerialPortIO::write_all(&mut self.port, data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        SerialPortIO::flush(&mut self.port).await
    }
}

/// Send a complete command frame and flush it out
///
/// # Arguments
///
/// * `port` - Any serial port implementation
/// * `frame` - Complete frame (head, command, data, checksum, tail)
pub async fn send_command<P: SerialPortIO + ?Sized>(port: &mut P, frame: &[u8]) -> Result<()> {
    port.write_all(frame)
        .await
        .map_err(|e| Sds011Error::Serial(format!("Failed to write command: {}", e)))?;

    port.flush()
        .await
        .map_err(|e| Sds011Error::Serial(format!("Failed to flush serial port: {}", e)))?;

    debug!("Sent SDS011 command ({} bytes): {:02X?}", frame.len(), frame);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::port_trait::mocks::MockSerialPort;
    use super::*;
    use crate::sds011::encoder::encode_set_period;

    #[test]
    fn test_constants() {
        assert_eq!(SDS011_BAUD_RATE, 9600);
        assert_eq!(DEFAULT_DEVICE_PATHS.len(), 2);
        assert_eq!(DEFAULT_DEVICE_PATHS[0], "/dev/ttyUSB0");
        assert_eq!(DEFAULT_DEVICE_PATHS[1], "/dev/ttyACM0");
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let result = SensorSerial::open_with_paths(invalid_paths, SDS011_BAUD_RATE);

        match result {
            Err(Sds011Error::SerialPortNotFound(msg)) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        let result = SensorSerial::open_with_paths(empty_paths, SDS011_BAUD_RATE);
        assert!(matches!(result, Err(Sds011Error::SerialPortNotFound(_))));
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        let result = SensorSerial::open_port("/dev/nonexistent_serial_device_12345", 9600);

        match result {
            Err(Sds011Error::Serial(msg)) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_send_command_writes_frame() {
        let mut port = MockSerialPort::new();
        let frame = encode_set_period(1).unwrap();

        send_command(&mut port, &frame).await.unwrap();

        assert_eq!(port.get_written_data(), vec![frame]);
    }

    #[tokio::test]
    async fn test_send_command_maps_write_error() {
        let mut port = MockSerialPort::new();
        port.set_write_error(io::ErrorKind::BrokenPipe);

        let result = send_command(&mut port, &[0xAA]).await;
        assert!(matches!(result, Err(Sds011Error::Serial(_))));
        assert!(port.get_written_data().is_empty());
    }

    // Integration test - only runs if an SDS011 is connected
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_open_with_real_hardware() {
        match SensorSerial::open() {
            Ok(mut serial) => {
                println!("Successfully opened SDS011 device at: {}", serial.device_path());
                let frame = encode_set_period(0).unwrap();
                send_command(&mut serial, &frame).await.unwrap();
            }
            Err(_) => println!("No SDS011 hardware detected (this is OK for CI/CD)"),
        }
    }
}
