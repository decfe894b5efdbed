//! Countdown timer that survives the popup closing
//!
//! Nothing runs while the popup is closed. The timer is stored as an end
//! timestamp plus its total duration, and every reading is recomputed from
//! the wall clock, so reopening the popup after any gap yields the right
//! remaining time.
//!
//! ```text
//! Idle --start--> Running --end passes--> Expired
//!   ^                |                       |
//!   +------stop------+-----------stop--------+
//! ```

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::store::{Durability, SharedStore};
use crate::time::{format_countdown, Clock, Millis, MINUTE_MS};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A persisted countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSession {
    /// When the countdown reaches zero (epoch ms)
    pub end_timestamp: Millis,
    /// Full length of the countdown; always positive
    pub total_duration_ms: Millis,
}

impl TimerSession {
    /// Milliseconds left at `now`, never negative
    pub fn remaining_at(&self, now: Millis) -> Millis {
        self.end_timestamp.saturating_sub(now).max(0)
    }

    /// How long ago the countdown finished, zero while it is running
    pub fn overrun_at(&self, now: Millis) -> Millis {
        now.saturating_sub(self.end_timestamp).max(0)
    }

    /// A session that could have been started by `start`: its start time is
    /// representable and no more than the full duration is left at `now`
    fn is_plausible_at(&self, now: Millis) -> bool {
        self.end_timestamp
            .checked_sub(self.total_duration_ms)
            .is_some()
            && self.remaining_at(now) <= self.total_duration_ms
    }
}

/// Timer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimerState {
    /// No countdown
    #[default]
    Idle,
    /// Counting down
    Running,
    /// Reached zero and still shown as `00:00`
    Expired,
}

/// Color band for the progress bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Band {
    #[default]
    Neutral,
    Warning,
    Danger,
}

/// A point-in-time view of the timer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerReading {
    pub state: TimerState,
    pub remaining_ms: Millis,
    /// Remaining share of the full duration, `0.0..=100.0`
    pub percentage: f64,
    /// `MM:SS`, rounded up to the next whole second
    pub display: String,
    pub band: Band,
}

impl TimerReading {
    fn idle() -> Self {
        Self {
            state: TimerState::Idle,
            remaining_ms: 0,
            percentage: 0.0,
            display: format_countdown(0),
            band: Band::Neutral,
        }
    }
}

/// Parse minutes the way the popup's number input does
///
/// Accepts leading whitespace, an optional sign and a run of digits, and
/// ignores whatever follows. `None` when there are no digits.
pub fn parse_minutes(input: &str) -> Option<i64> {
    let s = input.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // saturate absurdly long inputs instead of failing the parse
    let value = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

/// Owns the countdown and its persisted form
pub struct TimerEngine {
    session: Option<TimerSession>,
    store: SharedStore,
    clock: Arc<dyn Clock>,
    config: Arc<SessionConfig>,
    durability: Durability,
}

impl TimerEngine {
    /// Create an idle engine; call `recover_on_load` to pick up a saved timer
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>, config: Arc<SessionConfig>) -> Self {
        Self {
            session: None,
            store,
            clock,
            config,
            durability: Durability::default(),
        }
    }

    /// The active session, if any
    pub fn session(&self) -> Option<TimerSession> {
        self.session
    }

    /// Whether the last write failed
    pub fn is_degraded(&self) -> bool {
        self.durability.is_degraded()
    }

    /// Current state derived from the clock
    pub fn state(&self) -> TimerState {
        match self.session {
            None => TimerState::Idle,
            Some(s) if s.remaining_at(self.clock.now_ms()) > 0 => TimerState::Running,
            Some(_) => TimerState::Expired,
        }
    }

    /// Start a countdown of `minutes`, replacing any running one
    pub fn start(&mut self, minutes: i64) -> Result<TimerSession> {
        if minutes <= 0 {
            return Err(Error::validation("Please enter a positive number of minutes"));
        }
        let total_duration_ms = minutes
            .checked_mul(MINUTE_MS)
            .ok_or_else(|| Error::validation("That timer is too long"))?;
        let end_timestamp = self
            .clock
            .now_ms()
            .checked_add(total_duration_ms)
            .ok_or_else(|| Error::validation("That timer is too long"))?;

        let session = TimerSession {
            end_timestamp,
            total_duration_ms,
        };
        self.session = Some(session);
        self.persist(session);
        tracing::info!(minutes, end_timestamp, "timer started");
        Ok(session)
    }

    /// Start from raw input text
    pub fn start_from_input(&mut self, input: &str) -> Result<TimerSession> {
        let minutes = parse_minutes(input)
            .ok_or_else(|| Error::validation("Please enter a positive number of minutes"))?;
        self.start(minutes)
    }

    /// Clear the countdown. Safe to call when already idle.
    pub fn stop(&mut self) {
        if self.session.take().is_some() {
            tracing::info!("timer stopped");
        }
        let keys = &self.config.keys;
        let result = self
            .store
            .remove(&keys.timer_end)
            .and_then(|()| self.store.remove(&keys.timer_duration));
        self.durability.record("timer", result);
    }

    fn persist(&mut self, session: TimerSession) {
        let keys = &self.config.keys;
        let result = self
            .store
            .set(&keys.timer_end, &session.end_timestamp.to_string())
            .and_then(|()| {
                self.store
                    .set(&keys.timer_duration, &session.total_duration_ms.to_string())
            });
        self.durability.record("timer", result);
    }

    /// Read the timer now
    pub fn query_remaining(&self) -> TimerReading {
        let Some(session) = self.session else {
            return TimerReading::idle();
        };

        let remaining_ms = session.remaining_at(self.clock.now_ms());
        let percentage =
            (remaining_ms as f64 / session.total_duration_ms as f64 * 100.0).clamp(0.0, 100.0);
        let state = if remaining_ms > 0 {
            TimerState::Running
        } else {
            TimerState::Expired
        };

        TimerReading {
            state,
            remaining_ms,
            percentage,
            display: format_countdown(remaining_ms),
            band: self.band_for(percentage),
        }
    }

    fn band_for(&self, percentage: f64) -> Band {
        if percentage < self.config.danger_percent {
            Band::Danger
        } else if percentage < self.config.warning_percent {
            Band::Warning
        } else {
            Band::Neutral
        }
    }

    /// Rebuild the timer from storage after the popup reopens
    ///
    /// A countdown that is still going resumes. One that finished less than
    /// `stale_after_ms` ago is shown as expired. Anything older, or a
    /// half-written or corrupt session, is cleared.
    pub fn recover_on_load(&mut self) -> TimerState {
        self.session = None;
        let loaded = match self.load_session() {
            Ok(loaded) => loaded,
            Err(e) => {
                self.durability.record("timer", Err(e));
                return TimerState::Idle;
            }
        };

        let session = match loaded {
            Loaded::Nothing => return TimerState::Idle,
            Loaded::Corrupt(reason) => {
                tracing::warn!(%reason, "saved timer unreadable, clearing");
                self.stop();
                return TimerState::Idle;
            }
            Loaded::Session(session) => session,
        };

        let now = self.clock.now_ms();
        if session.remaining_at(now) > 0 {
            self.session = Some(session);
            tracing::info!(remaining_ms = session.remaining_at(now), "timer resumed");
            TimerState::Running
        } else if session.overrun_at(now) < self.config.stale_after_ms {
            self.session = Some(session);
            tracing::info!(overrun_ms = session.overrun_at(now), "timer finished while closed");
            TimerState::Expired
        } else {
            tracing::info!(overrun_ms = session.overrun_at(now), "stale timer discarded");
            self.stop();
            TimerState::Idle
        }
    }

    fn load_session(&self) -> Result<Loaded> {
        let keys = &self.config.keys;
        let end = self.store.get(&keys.timer_end)?;
        let duration = self.store.get(&keys.timer_duration)?;

        Ok(match (end, duration) {
            (None, None) => Loaded::Nothing,
            (Some(end), Some(duration)) => {
                match (end.trim().parse::<Millis>(), duration.trim().parse::<Millis>()) {
                    (Ok(end_timestamp), Ok(total_duration_ms)) if total_duration_ms > 0 => {
                        let session = TimerSession {
                            end_timestamp,
                            total_duration_ms,
                        };
                        if session.is_plausible_at(self.clock.now_ms()) {
                            Loaded::Session(session)
                        } else {
                            Loaded::Corrupt(format!(
                                "out of range end={} duration={}",
                                end, duration
                            ))
                        }
                    }
                    _ => Loaded::Corrupt(format!("end={:?} duration={:?}", end, duration)),
                }
            }
            (end, duration) => Loaded::Corrupt(format!(
                "incomplete session end={:?} duration={:?}",
                end, duration
            )),
        })
    }

    /// Step the minutes input up or down, clamped to the configured range
    ///
    /// Unparsable input counts as zero.
    pub fn adjust_minutes(&self, current: &str, delta: i64) -> i64 {
        let value = parse_minutes(current).unwrap_or(0);
        // both bounds apply in either direction, so a typed value outside the
        // range steps straight back into it
        value
            .saturating_add(delta)
            .clamp(self.config.min_minutes, self.config.max_minutes)
    }
}

enum Loaded {
    Nothing,
    Corrupt(String),
    Session(TimerSession),
}
