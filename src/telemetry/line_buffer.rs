//! # Line Buffer
//!
//! Accumulates raw bytes and hands out complete newline-terminated lines.

use bytes::{Buf, BytesMut};

/// Buffered bytes without a newline beyond which old data is dropped
pub const LINE_BUFFER_LIMIT: usize = 1024;

/// Bytes dropped from the front each time the limit is exceeded
pub const LINE_BUFFER_DISCARD: usize = 64;

/// Newline-delimited line extractor with bounded memory
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Remove and return the next non-empty line, without its newline
    ///
    /// Returns `None` when no complete line is buffered yet. While more than
    /// [`LINE_BUFFER_LIMIT`] bytes are waiting without a newline, the oldest
    /// [`LINE_BUFFER_DISCARD`] bytes are dropped, so at most the limit is
    /// retained afterwards. `None` never means end of stream.
    ///
    /// # Examples
    ///
    /// ```
    /// use sds011_logger::telemetry::line_buffer::LineBuffer;
    ///
    /// let mut lines = LineBuffer::new();
    /// lines.push(b"\n\nfirst\nsec");
    /// assert_eq!(lines.pop_line().as_deref(), Some("first"));
    /// assert_eq!(lines.pop_line(), None);
    /// lines.push(b"ond\n");
    /// assert_eq!(lines.pop_line().as_deref(), Some("second"));
    /// ```
    pub fn pop_line(&mut self) -> Option<String> {
        loop {
            let Some(pos) = self.buf.iter().position(|&b| b == b'\n') else {
                while self.buf.len() > LINE_BUFFER_LIMIT {
                    self.buf.advance(LINE_BUFFER_DISCARD);
                }
                return None;
            };

            let line = self.buf.split_to(pos + 1);
            if pos > 0 {
                return Some(String::from_utf8_lossy(&line[..pos]).into_owned());
            }
        }
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
