//! Wall-clock time for timer reconstruction
//!
//! Provides the time sources the engines read from:
//! - `Millis` - Epoch milliseconds
//! - `Clock` - Anything that can report the current time
//! - `SystemClock` - The real wall clock
//! - `ManualClock` - A settable clock for tests and replays

use std::sync::atomic::{AtomicI64, Ordering};

/// Milliseconds since the Unix epoch
pub type Millis = i64;

/// One minute in milliseconds
pub const MINUTE_MS: Millis = 60_000;

/// One hour in milliseconds
pub const HOUR_MS: Millis = 60 * MINUTE_MS;

/// A source of wall-clock time
pub trait Clock: Send + Sync {
    /// Current time in epoch milliseconds
    fn now_ms(&self) -> Millis;
}

/// The system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `now`
    pub fn new(now: Millis) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, now: Millis) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward (or backward, with a negative delta)
    pub fn advance(&self, delta: Millis) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}

/// Format a remaining duration as `MM:SS`
///
/// Rounds up to the next whole second so `00:00` only shows once time has
/// actually run out. Negative input formats as `00:00`.
pub fn format_countdown(ms: Millis) -> String {
    let ms = ms.max(0);
    let total_seconds = ms.saturating_add(999) / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}", minutes, seconds)
}
