//! Wall-clock abstraction so time-dependent logic can be tested

/// Source of the current time in milliseconds since the Unix epoch
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Current time (ms since epoch)
    fn now_millis(&self) -> i64;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
