//! # SDS011 Frame Decoder
//!
//! Byte-at-a-time state machine that extracts measurement frames from the
//! sensor's continuous serial stream.
//!
//! ```text
//! [0] 0xAA  head
//! [1] 0xC0  command
//! [2] PM2.5 low   [3] PM2.5 high
//! [4] PM10 low    [5] PM10 high
//! [6] id low      [7] id high
//! [8] checksum = sum([2..=7]) mod 256
//! [9] 0xAB  tail
//! ```
//!
//! A mismatch at the head, command, checksum or tail position resets the
//! machine to position 0; the next byte is treated as a potential head.

use std::collections::VecDeque;

use tracing::debug;

use super::protocol::*;

/// Number of recently seen bytes kept for malformed-frame diagnostics
const RECENT_BYTES: usize = SDS011_DATA_FRAME_SIZE + 2;

/// Streaming decoder for SDS011 measurement frames
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Position of the next byte within the frame (0..10)
    position: usize,
    pm25_raw: u16,
    pm10_raw: u16,
    checksum: u8,
    /// Last completed reading
    reading: Option<PmReading>,
    malformed: u64,
    recent: VecDeque<u8>,
}

impl FrameDecoder {
    /// Create a decoder waiting for a frame head
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte into the state machine
    ///
    /// # Returns
    ///
    /// * `bool` - true exactly when this byte completed a valid frame;
    ///   the values are then available through [`FrameDecoder::reading`]
    ///
    /// # Examples
    ///
    /// ```
    /// use sds011_logger::sds011::decoder::FrameDecoder;
    ///
    /// let frame = [0xAA, 0xC0, 0x2C, 0x01, 0x48, 0x01, 0x00, 0x00, 0x76, 0xAB];
    /// let mut decoder = FrameDecoder::new();
    /// let completed: Vec<bool> = frame.iter().map(|&b| decoder.feed(b)).collect();
    /// assert!(completed[9]);
    /// assert_eq!(decoder.reading().unwrap().pm25, 30.0);
    /// ```
    pub fn feed(&mut self, byte: u8) -> bool {
        self.remember(byte);

        let valid = match self.position {
            0 => byte == SDS011_HEAD_BYTE,
            1 => byte == SDS011_CMD_DATA,
            2 => {
                self.pm25_raw = byte as u16;
                self.checksum = byte;
                true
            }
            3 => {
                self.pm25_raw |= (byte as u16) << 8;
                self.checksum = self.checksum.wrapping_add(byte);
                true
            }
            4 => {
                self.pm10_raw = byte as u16;
                self.checksum = self.checksum.wrapping_add(byte);
                true
            }
            5 => {
                self.pm10_raw |= (byte as u16) << 8;
                self.checksum = self.checksum.wrapping_add(byte);
                true
            }
            6 | 7 => {
                self.checksum = self.checksum.wrapping_add(byte);
                true
            }
            8 => byte == self.checksum,
            _ => byte == SDS011_TAIL_BYTE,
        };

        if !valid {
            self.reject(byte);
            return false;
        }

        self.position += 1;
        if self.position < SDS011_DATA_FRAME_SIZE {
            return false;
        }

        self.reading = Some(PmReading::from_raw(self.pm25_raw, self.pm10_raw));
        self.reset();
        self.recent.clear();
        true
    }

    /// Feed a buffer and collect every reading completed within it
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<PmReading> {
        let mut readings = Vec::new();
        for &byte in bytes {
            if self.feed(byte) {
                readings.extend(self.reading);
            }
        }
        readings
    }

    /// Last completed reading, if any
    pub fn reading(&self) -> Option<PmReading> {
        self.reading
    }

    /// Number of frames rejected since creation
    pub fn malformed_frames(&self) -> u64 {
        self.malformed
    }

    /// Reset transition: back to position 0 with cleared accumulators
    fn reset(&mut self) {
        self.position = 0;
        self.pm25_raw = 0;
        self.pm10_raw = 0;
        self.checksum = 0;
    }

    fn reject(&mut self, byte: u8) {
        // A stray byte while hunting for a head is not a broken frame
        if self.position > 0 {
            self.malformed += 1;
            debug!(
                "Malformed SDS011 frame at byte {} (0x{:02X}), recent: {:02X?}",
                self.position, byte, self.recent
            );
        }
        self.reset();
    }

    fn remember(&mut self, byte: u8) {
        if self.recent.len() == RECENT_BYTES {
            self.recent.pop_front();
        }
        self.recent.push_back(byte);
    }
}
