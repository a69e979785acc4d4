//! # Ingestion Task
//!
//! Reads the sensor's serial stream, decodes measurement frames and feeds
//! them to the log decoder as reading lines.

use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Result, Sds011Error};
use crate::sds011::decoder::FrameDecoder;
use crate::sds011::encoder::encode_set_period;
use crate::serial::port_trait::SerialPortIO;
use crate::serial::send_command;
use crate::telemetry::decoder::LogDecoder;

/// Serial read buffer size
pub const READ_BUFFER_SIZE: usize = 1024;

/// Number of readings between status log messages
const LOG_INTERVAL_READINGS: u64 = 600;

/// Ingestion settings
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Working period sent to the sensor (minutes, 0 = continuous)
    pub period_minutes: u8,

    /// Delay after opening the port before the first command
    pub warmup: Duration,

    /// Longest silence tolerated on the serial line
    pub read_timeout: Duration,
}

/// Run the ingestion loop until the stream ends
///
/// Sends the set-period command after the warm-up delay and once more
/// after the first reading (the sensor tends to miss commands sent while it
/// is still starting up).
///
/// # Returns
///
/// * `Result<u64>` - Number of readings ingested when the port reports end
///   of stream
///
/// # Errors
///
/// Returns error if the period is invalid, the port fails or stays silent
/// longer than `read_timeout`, or the live log cannot be written.
pub async fn run_ingestion<P, C>(
    port: &mut P,
    decoder: &mut LogDecoder<C>,
    options: &IngestOptions,
) -> Result<u64>
where
    P: SerialPortIO + ?Sized,
    C: Clock,
{
    let command = encode_set_period(options.period_minutes)?;

    if !options.warmup.is_zero() {
        debug!("Waiting {:?} for the sensor to start", options.warmup);
        sleep(options.warmup).await;
    }
    send_command(port, &command).await?;
    info!("Requested working period of {} minute(s)", options.period_minutes);

    let mut frames = FrameDecoder::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut readings: u64 = 0;

    loop {
        let n = match timeout(options.read_timeout, port.read(&mut buf)).await {
            Ok(read) => read.map_err(|e| Sds011Error::Serial(format!("Read failed: {}", e)))?,
            Err(_) => {
                return Err(Sds011Error::Serial(format!(
                    "No data for {:?}",
                    options.read_timeout
                )))
            }
        };
        if n == 0 {
            info!("Serial stream closed after {} readings", readings);
            return Ok(readings);
        }

        for reading in frames.decode(&buf[..n]) {
            match decoder.add(reading.to_line().as_bytes()) {
                Ok(()) => {}
                Err(e @ Sds011Error::TimestampRegression { .. }) => {
                    warn!("Dropped reading: {}", e);
                }
                Err(e) => return Err(e),
            }

            readings += 1;
            if readings == 1 {
                send_command(port, &command).await?;
            }
            if readings % LOG_INTERVAL_READINGS == 0 {
                info!(
                    "Ingested {} readings ({} malformed frames)",
                    readings,
                    frames.malformed_frames()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::sds011::checksum::checksum;
    use crate::serial::port_trait::mocks::MockSerialPort;
    use crate::telemetry::series::SeriesStore;
    use std::io;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn frame(pm25_raw: u16, pm10_raw: u16) -> Vec<u8> {
        let a = pm25_raw.to_le_bytes();
        let b = pm10_raw.to_le_bytes();
        let payload = [a[0], a[1], b[0], b[1], 0x12, 0x34];
        let mut frame = vec![0xAA, 0xC0];
        frame.extend_from_slice(&payload);
        frame.push(checksum(&payload));
        frame.push(0xAB);
        frame
    }

    fn options(period_minutes: u8) -> IngestOptions {
        IngestOptions {
            period_minutes,
            warmup: Duration::ZERO,
            read_timeout: Duration::from_secs(5),
        }
    }

    fn live_decoder(dir: &TempDir) -> LogDecoder<SystemClock> {
        LogDecoder::open(dir.path(), Arc::new(SeriesStore::new()), SystemClock).unwrap()
    }

    #[tokio::test]
    async fn test_ingests_frames_into_series_and_log() {
        let dir = TempDir::new().unwrap();
        let mut decoder = live_decoder(&dir);
        let mut port = MockSerialPort::new();

        let mut first = frame(300, 328);
        first.extend_from_slice(&frame(15, 20));
        port.push_read(&first[..13]);
        port.push_read(&first[13..]);
        port.push_read(&[0xAA, 0xC0, 0x00]);

        let count = assert_ok!(run_ingestion(&mut port, &mut decoder, &options(0)).await);
        assert_eq!(count, 2);

        let snap = decoder.snapshot();
        assert_eq!(snap.pm25, vec![30.0, 1.5]);
        assert_eq!(snap.pm10, vec![32.8, 2.0]);
        assert_eq!(snap.last, "ug/m3 PM2.5=1.5, PM10=2.0");

        let log = std::fs::read_to_string(decoder.live_log_path().unwrap()).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert!(lines[0].starts_with("ts="));
        assert_eq!(&lines[1..], &["ug/m3 PM2.5=30.0, PM10=32.8", "ug/m3 PM2.5=1.5, PM10=2.0"]);
    }

    #[tokio::test]
    async fn test_period_command_sent_twice() {
        let dir = TempDir::new().unwrap();
        let mut decoder = live_decoder(&dir);
        let mut port = MockSerialPort::new();
        port.push_read(&frame(1, 1));
        port.push_read(&frame(2, 2));

        assert_ok!(run_ingestion(&mut port, &mut decoder, &options(5)).await);

        let expected = encode_set_period(5).unwrap();
        assert_eq!(port.get_written_data(), vec![expected.clone(), expected]);
    }

    #[tokio::test]
    async fn test_no_readings_sends_single_command() {
        let dir = TempDir::new().unwrap();
        let mut decoder = live_decoder(&dir);
        let mut port = MockSerialPort::new();
        port.push_read(&[0x00, 0x01, 0x02]);

        let count = assert_ok!(run_ingestion(&mut port, &mut decoder, &options(0)).await);
        assert_eq!(count, 0);
        assert_eq!(port.get_written_data().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_period_fails_before_io() {
        let dir = TempDir::new().unwrap();
        let mut decoder = live_decoder(&dir);
        let mut port = MockSerialPort::new();

        let result = run_ingestion(&mut port, &mut decoder, &options(31)).await;
        assert!(matches!(result, Err(Sds011Error::InvalidPeriod(31))));
        assert!(port.get_written_data().is_empty());
    }

    #[tokio::test]
    async fn test_read_error_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut decoder = live_decoder(&dir);
        let mut port = MockSerialPort::new();
        port.set_read_error(io::ErrorKind::BrokenPipe);

        let err = assert_err!(run_ingestion(&mut port, &mut decoder, &options(0)).await);
        assert!(matches!(err, Sds011Error::Serial(_)));
    }
}
