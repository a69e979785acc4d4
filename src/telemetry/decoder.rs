//! # Log Decoder
//!
//! Turns reading lines into series samples and persistent log records.
//!
//! The decoder starts out *replaying*: every historic `sds011_<ts>.dat` file
//! in the log directory is fed through [`LogDecoder::add`], oldest first.
//! Afterwards it opens a fresh log file and goes *live*: readings are
//! stamped with the wall clock and appended to that file.
//!
//! Two record kinds are persisted, one per line:
//!
//! ```text
//! ts=1700000000000
//! ug/m3 PM2.5=30.0, PM10=32.8
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, error, info, warn};

use super::line_buffer::LineBuffer;
use super::log_file::{log_file_name, scan_log_files, LogFile};
use super::series::{Series, SeriesSnapshot};
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, Sds011Error};

/// Assumed spacing of replayed readings (ms)
///
/// Historic files only carry a `ts=` marker once a minute, so samples in
/// between are spaced by this nominal 1 Hz cadence. It is an approximation
/// of the sensor's continuous mode, not a measured value.
pub const REPLAY_SAMPLE_INTERVAL_MS: i64 = 990;

/// Maximum gap between two `ts=` markers in a live log (ms)
pub const RESYNC_INTERVAL_MS: i64 = 60_000;

static READING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ug/m3 PM2\.5=(\d+\.\d+), PM10=(\d+\.\d+)").expect("Invalid reading regex")
});

static RESYNC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ts=(\d+)").expect("Invalid resync regex"));

/// Stateful decoder for live and replayed reading lines
pub struct LogDecoder<C: Clock = SystemClock> {
    dir: PathBuf,
    lines: LineBuffer,
    series: Arc<dyn Series>,
    clock: C,
    /// First timestamp ever observed; series timestamps are relative to it
    start: Option<i64>,
    /// Replay: running clock. Live: time of the last `ts=` marker written.
    last_ts: i64,
    /// Live log; `None` while replaying
    out: Option<File>,
    live_path: Option<PathBuf>,
}

impl<C: Clock> std::fmt::Debug for LogDecoder<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogDecoder")
            .field("dir", &self.dir)
            .field("start", &self.start)
            .field("last_ts", &self.last_ts)
            .field("live_path", &self.live_path)
            .finish_non_exhaustive()
    }
}

impl<C: Clock> LogDecoder<C> {
    /// Replay the log directory and open a new live log
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory holding the persistent logs (created if missing)
    /// * `series` - Series receiving every accepted reading
    /// * `clock` - Wall-clock source
    ///
    /// # Errors
    ///
    /// Returns error if the directory or a historic file cannot be read, or
    /// if the live log cannot be created. All of these are fatal.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use sds011_logger::clock::SystemClock;
    /// use sds011_logger::telemetry::decoder::LogDecoder;
    /// use sds011_logger::telemetry::series::SeriesStore;
    ///
    /// let mut decoder = LogDecoder::open("./logs", Arc::new(SeriesStore::new()), SystemClock)?;
    /// decoder.add(b"ug/m3 PM2.5=12.3, PM10=45.6\n")?;
    /// # Ok::<(), sds011_logger::error::Sds011Error>(())
    /// ```
    pub fn open<P: AsRef<Path>>(dir: P, series: Arc<dyn Series>, clock: C) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut decoder = Self {
            dir,
            lines: LineBuffer::new(),
            series,
            clock,
            start: None,
            last_ts: 0,
            out: None,
            live_path: None,
        };

        let replayed = decoder.replay_dir()?;
        info!("Replayed {} log file(s) from {}", replayed, decoder.dir.display());

        decoder.go_live()?;
        Ok(decoder)
    }

    /// Feed raw bytes (live frame text or historic file contents)
    ///
    /// Every complete line is processed. Partial trailing data stays
    /// buffered until its newline arrives.
    ///
    /// # Errors
    ///
    /// * `TimestampRegression` - a `ts=` marker went backwards while
    ///   replaying; the rest of the buffered input is discarded
    /// * `Io` - the live log could not be written
    pub fn add(&mut self, bytes: &[u8]) -> Result<()> {
        self.lines.push(bytes);

        while let Some(line) = self.lines.pop_line() {
            if let Err(e) = self.process_line(&line) {
                self.lines.clear();
                return Err(e);
            }
        }
        Ok(())
    }

    /// Copy of the series stamped with the current time
    pub fn snapshot(&self) -> SeriesSnapshot {
        self.series.snapshot(self.clock.now_millis())
    }

    /// Shared handle to the series
    pub fn series(&self) -> Arc<dyn Series> {
        Arc::clone(&self.series)
    }

    /// True once the live log is open
    pub fn is_live(&self) -> bool {
        self.out.is_some()
    }

    /// Path of the live log, if open
    pub fn live_log_path(&self) -> Option<&Path> {
        self.live_path.as_deref()
    }

    /// Timestamp all series entries are relative to
    pub fn series_start(&self) -> Option<i64> {
        self.start
    }

    fn replay_dir(&mut self) -> Result<usize> {
        let mut replayed = 0;
        for file in scan_log_files(&self.dir)? {
            if self.replay_file(&file)? {
                replayed += 1;
            }
        }
        Ok(replayed)
    }

    /// Replay one historic file; `Ok(false)` when it was skipped
    fn replay_file(&mut self, file: &LogFile) -> Result<bool> {
        if file.timestamp < self.last_ts {
            warn!(
                "Skipping {}: timestamp {} is older than {}",
                file.path.display(),
                file.timestamp,
                self.last_ts
            );
            return Ok(false);
        }

        info!("Replaying {}", file.path.display());
        let data = fs::read(&file.path)?;

        self.last_ts = file.timestamp;
        self.start.get_or_insert(file.timestamp);

        let mut result = self.add(&data);
        if result.is_ok() && !data.is_empty() && !data.ends_with(b"\n") {
            result = self.add(b"\n");
        }
        self.lines.clear();

        match result {
            Ok(()) => Ok(true),
            Err(e @ Sds011Error::TimestampRegression { .. }) => {
                error!("Aborted replay of {}: {}", file.path.display(), e);
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    fn go_live(&mut self) -> Result<()> {
        let now = self.clock.now_millis();
        self.start.get_or_insert(now);

        let path = self.dir.join(log_file_name(now));
        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        info!("Logging readings to {}", path.display());

        self.out = Some(file);
        self.live_path = Some(path);
        Ok(())
    }

    fn process_line(&mut self, line: &str) -> Result<()> {
        if self.out.is_none() {
            for caps in RESYNC_REGEX.captures_iter(line) {
                let ts: i64 = match caps[1].parse() {
                    Ok(ts) => ts,
                    Err(e) => {
                        warn!("Invalid resync marker {}: {}", &caps[0], e);
                        continue;
                    }
                };
                if ts < self.last_ts {
                    return Err(Sds011Error::TimestampRegression {
                        previous: self.last_ts,
                        found: ts,
                    });
                }
                self.last_ts = ts;
            }
        }

        for caps in READING_REGEX.captures_iter(line) {
            let record = &caps[0];
            let (pm25, pm10) = match (caps[1].parse::<f64>(), caps[2].parse::<f64>()) {
                (Ok(pm25), Ok(pm10)) => (pm25, pm10),
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Invalid input in {}: {}", record, e);
                    continue;
                }
            };

            let ts = match self.out.as_mut() {
                None => {
                    let ts = self.last_ts;
                    self.last_ts += REPLAY_SAMPLE_INTERVAL_MS;
                    ts
                }
                Some(out) => {
                    let now = self.clock.now_millis();
                    if now - self.last_ts > RESYNC_INTERVAL_MS {
                        self.last_ts = now;
                        out.write_all(format!("ts={}\n", now).as_bytes())?;
                    }
                    out.write_all(format!("{}\n", record).as_bytes())?;
                    now
                }
            };

            debug!("{} - {}, {}", record, pm25, pm10);
            let start = *self.start.get_or_insert(ts);
            self.series.append(record, pm25, pm10, ts - start);
        }

        Ok(())
    }
}
