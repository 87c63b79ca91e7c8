//! Time sources for dwell and cooldown logic.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Longest span a configured or recorded offset may cover: 100 years.
///
/// Keeps every `DateTime + span` comfortably inside chrono's range.
pub const MAX_SPAN_MS: u64 = 100 * 365 * 24 * 60 * 60 * 1000;

/// Milliseconds as a chrono span, saturating at [`MAX_SPAN_MS`].
pub fn span_ms(ms: u64) -> Duration {
    Duration::milliseconds(ms.min(MAX_SPAN_MS) as i64)
}

/// A source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Used by tests and by recording replay, where time follows the recorded
/// frame timestamps instead of the wall clock.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Set the current time.
    pub fn set(&self, time: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = time;
    }

    /// Move the clock forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: i64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += Duration::milliseconds(ms);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
