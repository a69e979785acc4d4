//! # Series Store
//!
//! Bounded in-memory time series of PM readings shared between the
//! ingestion task and the query server.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

/// Retained samples: 30 days at 1 Hz
pub const SERIES_CAPACITY: usize = 30 * 24 * 60 * 60;

/// Samples dropped from the front once capacity is exceeded (1 hour at 1 Hz)
pub const SERIES_EVICT_BATCH: usize = 60 * 60;

/// Point-in-time copy of the series
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesSnapshot {
    /// Raw text of the most recent reading
    pub last: String,

    /// Query instant (ms since epoch)
    #[serde(rename = "started")]
    pub now: i64,

    /// PM2.5 values in µg/m³
    pub pm25: Vec<f64>,

    /// PM10 values in µg/m³
    pub pm10: Vec<f64>,

    /// Timestamps relative to the series start (ms)
    pub ts: Vec<i64>,
}

/// Append/snapshot interface of the shared series
pub trait Series: Send + Sync {
    /// Append one reading
    fn append(&self, message: &str, pm25: f64, pm10: f64, relative_ts: i64);

    /// Copy the current state, stamped with `now`
    fn snapshot(&self, now: i64) -> SeriesSnapshot;
}

#[derive(Debug, Default)]
struct SeriesState {
    last: String,
    pm25: Vec<f64>,
    pm10: Vec<f64>,
    ts: Vec<i64>,
}

/// Mutex-guarded series with batch eviction
#[derive(Debug)]
pub struct SeriesStore {
    state: Mutex<SeriesState>,
    capacity: usize,
    evict_batch: usize,
}

impl Default for SeriesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesStore {
    /// Store holding 30 days of 1 Hz samples
    pub fn new() -> Self {
        Self::with_capacity(SERIES_CAPACITY, SERIES_EVICT_BATCH)
    }

    /// Store with a custom capacity and eviction batch
    ///
    /// `evict_batch` is clamped to `1..=capacity + 1` so an overflow always
    /// brings the length back under the limit.
    pub fn with_capacity(capacity: usize, evict_batch: usize) -> Self {
        Self {
            state: Mutex::new(SeriesState::default()),
            capacity,
            evict_batch: evict_batch.clamp(1, capacity + 1),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.state.lock().ts.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Series for SeriesStore {
    fn append(&self, message: &str, pm25: f64, pm10: f64, relative_ts: i64) {
        let mut state = self.state.lock();

        let relative_ts = match state.ts.last() {
            Some(&last) if relative_ts < last => {
                debug!("Out-of-order sample at {} ms clamped to {} ms", relative_ts, last);
                last
            }
            _ => relative_ts,
        };

        state.last.clear();
        state.last.push_str(message);
        state.pm25.push(pm25);
        state.pm10.push(pm10);
        state.ts.push(relative_ts);

        if state.ts.len() > self.capacity {
            let n = self.evict_batch;
            state.pm25.drain(..n);
            state.pm10.drain(..n);
            state.ts.drain(..n);
        }
    }

    fn snapshot(&self, now: i64) -> SeriesSnapshot {
        let state = self.state.lock();
        SeriesSnapshot {
            last: state.last.clone(),
            now,
            pm25: state.pm25.clone(),
            pm10: state.pm10.clone(),
            ts: state.ts.clone(),
        }
    }
}
