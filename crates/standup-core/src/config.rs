//! Session Configuration - Limits, storage keys and animation timings
//!
//! Every constant the engines depend on lives here so a host can override
//! it from a RON file. The defaults reproduce the popup's behavior.

use crate::error::{Error, Result};
use crate::time::{Millis, HOUR_MS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Keys used in the persistent store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    /// Roster snapshot (JSON array)
    pub roster: String,
    /// Backlog snapshot (JSON array)
    pub backlog: String,
    /// Timer end timestamp (decimal epoch ms)
    pub timer_end: String,
    /// Timer total duration (decimal ms)
    pub timer_duration: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            roster: "scrumUsers".to_string(),
            backlog: "scrumPartBItems".to_string(),
            timer_end: "scrumTimerEnd".to_string(),
            timer_duration: "scrumTimerDuration".to_string(),
        }
    }
}

/// A name pair in the built-in roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultMember {
    pub first_name: String,
    pub last_name: String,
}

impl DefaultMember {
    fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        }
    }
}

/// Configuration for a stand-up session
///
/// # Example
///
/// ```
/// use standup_core::SessionConfig;
///
/// let config = SessionConfig::from_ron_str("(max_name_len: 30)").unwrap();
/// assert_eq!(config.max_name_len, 30);
/// // unspecified fields keep their defaults
/// assert_eq!(config.reel_tail, 6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Storage key names
    pub keys: StorageKeys,
    /// Roster used on first run or when the snapshot is unreadable
    pub default_roster: Vec<DefaultMember>,
    /// Longest first or last name, in characters
    pub max_name_len: usize,
    /// Longest backlog topic, in characters
    pub max_topic_len: usize,
    /// How long after expiry a finished timer is still shown as `00:00`
    pub stale_after_ms: Millis,
    /// Smallest reel slot the winner can land on
    pub min_winner_slot: usize,
    /// Number of distinct winner slots starting at `min_winner_slot`
    pub winner_slot_spread: usize,
    /// Decoys shown after the winner slot
    pub reel_tail: usize,
    /// Delay between starting a pick and revealing the winner
    pub reveal_delay_ms: u64,
    /// Timer refresh interval
    pub tick_interval_ms: u64,
    /// Idle time after the last search keystroke before the query clears
    pub search_clear_ms: u64,
    /// Lower bound of the minutes stepper
    pub min_minutes: i64,
    /// Upper bound of the minutes stepper
    pub max_minutes: i64,
    /// Stepper increment
    pub minutes_step: i64,
    /// Below this percentage the timer is in the danger band
    pub danger_percent: f64,
    /// Below this percentage the timer is in the warning band
    pub warning_percent: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keys: StorageKeys::default(),
            default_roster: vec![
                DefaultMember::new("Jane", "Doe"),
                DefaultMember::new("John", "Smith"),
                DefaultMember::new("Alice", "Johnson"),
                DefaultMember::new("Bob", "Williams"),
                DefaultMember::new("Charlie", "Brown"),
            ],
            max_name_len: 20,
            max_topic_len: 100,
            stale_after_ms: HOUR_MS,
            min_winner_slot: 40,
            winner_slot_spread: 10,
            reel_tail: 6,
            reveal_delay_ms: 4050,
            tick_interval_ms: 1000,
            search_clear_ms: 8000,
            min_minutes: 1,
            max_minutes: 180,
            minutes_step: 5,
            danger_percent: 10.0,
            warning_percent: 25.0,
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from RON text
    pub fn from_ron_str(content: &str) -> Result<Self> {
        let config: SessionConfig =
            ron::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a RON file
    pub fn from_ron_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_ron_str(&content)
    }

    /// Largest slot the winner can land on
    pub fn max_winner_slot(&self) -> usize {
        self.min_winner_slot + self.winner_slot_spread.saturating_sub(1)
    }

    /// Reject values the engines cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_name_len == 0 || self.max_topic_len == 0 {
            return Err(Error::Config("length limits must be positive".into()));
        }
        if self.winner_slot_spread == 0 {
            return Err(Error::Config("winner_slot_spread must be at least 1".into()));
        }
        if self.stale_after_ms < 0 {
            return Err(Error::Config("stale_after_ms cannot be negative".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be positive".into()));
        }
        if self.min_minutes < 1 || self.max_minutes < self.min_minutes {
            return Err(Error::Config(format!(
                "minutes range {}..={} is empty",
                self.min_minutes, self.max_minutes
            )));
        }
        if !(0.0..=100.0).contains(&self.danger_percent)
            || !(0.0..=100.0).contains(&self.warning_percent)
            || self.danger_percent > self.warning_percent
        {
            return Err(Error::Config(
                "band thresholds must satisfy 0 <= danger <= warning <= 100".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.default_roster.len(), 5);
        assert_eq!(config.min_winner_slot, 40);
        assert_eq!(config.max_winner_slot(), 49);
        assert_eq!(config.keys.roster, "scrumUsers");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = SessionConfig::from_ron_str(
            r#"(
                keys: (roster: "teamA"),
                reveal_delay_ms: 1000,
            )"#,
        )
        .unwrap();
        assert_eq!(config.keys.roster, "teamA");
        assert_eq!(config.keys.timer_end, "scrumTimerEnd");
        assert_eq!(config.reveal_delay_ms, 1000);
        assert_eq!(config.max_name_len, 20);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SessionConfig::from_ron_str("(winner_slot_spread: 0)").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = SessionConfig::from_ron_str("(danger_percent: 50.0, warning_percent: 20.0)")
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unparsable_ron() {
        let err = SessionConfig::from_ron_str("(max_name_len: \"long\")").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(max_topic_len: 50)").unwrap();

        let config = SessionConfig::from_ron_file(file.path()).unwrap();
        assert_eq!(config.max_topic_len, 50);

        let missing = SessionConfig::from_ron_file("/definitely/not/here.ron");
        assert!(matches!(missing, Err(Error::Config(_))));
    }
}
