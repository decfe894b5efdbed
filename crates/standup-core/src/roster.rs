//! Roster of stand-up participants
//!
//! Participants have no surrogate id: two entries are the same person when
//! their trimmed first and last names match ignoring case. The engine keeps
//! that invariant on every path that brings names in (load, add and import).

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::rng::PickRng;
use crate::store::{read_json, write_json, Durability, SharedStore, Snapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A stand-up participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub first_name: String,
    pub last_name: String,
    /// Has given their update this round
    #[serde(default)]
    pub spoken: bool,
}

impl Participant {
    /// Create an unspoken participant
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            spoken: false,
        }
    }

    /// Identity used for duplicate detection and lookups
    pub fn key(&self) -> ParticipantKey {
        ParticipantKey::new(&self.first_name, &self.last_name)
    }

    /// "First Last"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Upper-cased first letter of each name
    pub fn initials(&self) -> String {
        self.first_name
            .chars()
            .take(1)
            .chain(self.last_name.chars().take(1))
            .flat_map(char::to_uppercase)
            .collect()
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

/// Normalized name pair identifying a participant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantKey {
    first: String,
    last: String,
}

impl ParticipantKey {
    /// Build a key from raw names (trimmed, lower-cased)
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            first: first_name.trim().to_lowercase(),
            last: last_name.trim().to_lowercase(),
        }
    }
}

impl From<&Participant> for ParticipantKey {
    fn from(p: &Participant) -> Self {
        p.key()
    }
}

/// Keep the first participant of each identity, in order
fn dedup_by_key(participants: Vec<Participant>) -> Vec<Participant> {
    let mut seen = HashSet::new();
    participants
        .into_iter()
        .filter(|p| seen.insert(p.key()))
        .collect()
}

/// Owns the ordered roster and keeps it persisted
pub struct RosterEngine {
    participants: Vec<Participant>,
    store: SharedStore,
    config: Arc<SessionConfig>,
    durability: Durability,
}

impl RosterEngine {
    /// Load the roster from the store, falling back to the built-in team
    ///
    /// A missing or unreadable snapshot is replaced by the defaults and the
    /// defaults are written back so the next load sees the same roster.
    pub fn load(store: SharedStore, config: Arc<SessionConfig>) -> Self {
        let mut engine = Self {
            participants: Vec::new(),
            store,
            config,
            durability: Durability::default(),
        };

        match read_json::<Vec<Participant>>(engine.store.as_ref(), &engine.config.keys.roster) {
            Snapshot::Found(participants) => {
                tracing::debug!(count = participants.len(), "roster loaded");
                let loaded = participants.len();
                engine.participants = dedup_by_key(participants);
                let dropped = loaded - engine.participants.len();
                if dropped > 0 {
                    tracing::warn!(dropped, "duplicate names in saved roster, keeping the first");
                    engine.persist();
                }
            }
            Snapshot::Missing => {
                tracing::info!("no saved roster, using defaults");
                engine.participants = engine.defaults();
                engine.persist();
            }
            Snapshot::Corrupt(reason) => {
                tracing::warn!(%reason, "saved roster unreadable, using defaults");
                engine.participants = engine.defaults();
                engine.persist();
            }
            Snapshot::Unavailable(e) => {
                engine.participants = engine.defaults();
                engine.durability.record("roster", Err(e));
            }
        }

        engine
    }

    fn defaults(&self) -> Vec<Participant> {
        self.config
            .default_roster
            .iter()
            .map(|m| Participant::new(m.first_name.clone(), m.last_name.clone()))
            .collect()
    }

    fn persist(&mut self) {
        let result = write_json(
            self.store.as_ref(),
            &self.config.keys.roster,
            &self.participants,
        );
        self.durability.record("roster", result);
    }

    /// Current roster in display order
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Number of participants
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Check if the roster is empty
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Find a participant by identity
    pub fn get(&self, key: &ParticipantKey) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.key() == key)
    }

    /// Whether the last write failed
    pub fn is_degraded(&self) -> bool {
        self.durability.is_degraded()
    }

    /// Number of participants who have spoken
    pub fn spoken_count(&self) -> usize {
        self.participants.iter().filter(|p| p.spoken).count()
    }

    /// True when the roster is non-empty and everyone has spoken
    pub fn all_spoken(&self) -> bool {
        !self.participants.is_empty() && self.participants.iter().all(|p| p.spoken)
    }

    /// Participants whose full name contains `query`, ignoring case
    pub fn search(&self, query: &str) -> Vec<&Participant> {
        let query = query.trim().to_lowercase();
        self.participants
            .iter()
            .filter(|p| query.is_empty() || p.full_name().to_lowercase().contains(&query))
            .collect()
    }

    /// Check a name pair against the length rules and return it trimmed
    fn validate_names<'a>(
        &self,
        first_name: &'a str,
        last_name: &'a str,
    ) -> Result<(&'a str, &'a str)> {
        let first = first_name.trim();
        let last = last_name.trim();
        if first.is_empty() || last.is_empty() {
            return Err(Error::validation("Please enter both first and last name"));
        }
        let max = self.config.max_name_len;
        if first.chars().count() > max || last.chars().count() > max {
            return Err(Error::validation(format!(
                "Names must be {} characters or less",
                max
            )));
        }
        Ok((first, last))
    }

    /// Append a new unspoken participant
    pub fn add(&mut self, first_name: &str, last_name: &str) -> Result<&[Participant]> {
        let (first, last) = self.validate_names(first_name, last_name)?;
        let key = ParticipantKey::new(first, last);
        if self.get(&key).is_some() {
            return Err(Error::duplicate("This user already exists in the list"));
        }

        self.participants.push(Participant::new(first, last));
        tracing::debug!(name = %format!("{} {}", first, last), "participant added");
        self.persist();
        Ok(&self.participants)
    }

    /// Remove a participant if present
    pub fn remove(&mut self, key: &ParticipantKey) -> &[Participant] {
        let before = self.participants.len();
        self.participants.retain(|p| &p.key() != key);
        if self.participants.len() != before {
            tracing::debug!("participant removed");
            self.persist();
        }
        &self.participants
    }

    /// Flip the spoken flag of one participant
    pub fn toggle_spoken(&mut self, key: &ParticipantKey) -> &[Participant] {
        if let Some(p) = self.participants.iter_mut().find(|p| &p.key() == key) {
            p.spoken = !p.spoken;
            tracing::debug!(name = %p, spoken = p.spoken, "spoken toggled");
            self.persist();
        }
        &self.participants
    }

    /// Set the spoken flag of one participant
    ///
    /// Returns false when nobody matches `key`.
    pub fn set_spoken(&mut self, key: &ParticipantKey, spoken: bool) -> bool {
        match self.participants.iter_mut().find(|p| &p.key() == key) {
            Some(p) => {
                p.spoken = spoken;
                tracing::debug!(name = %p, spoken, "spoken set");
                self.persist();
                true
            }
            None => false,
        }
    }

    /// Start a new round: nobody has spoken
    pub fn reset_all_spoken(&mut self) -> &[Participant] {
        for p in &mut self.participants {
            p.spoken = false;
        }
        tracing::debug!("round reset");
        self.persist();
        &self.participants
    }

    /// Randomly reorder the roster
    pub fn shuffle(&mut self, rng: &mut PickRng) -> &[Participant] {
        rng.shuffle(&mut self.participants);
        tracing::debug!("roster shuffled");
        self.persist();
        &self.participants
    }

    /// Replace the whole roster from an import payload
    ///
    /// The payload must be an array of objects with string `firstName` and
    /// `lastName` fields. Any bad entry rejects the whole import and leaves
    /// the current roster as it was. Imported participants start unspoken.
    pub fn import_snapshot(&mut self, raw: &JsonValue) -> Result<&[Participant]> {
        let entries = raw.as_array().ok_or_else(|| {
            Error::validation(
                "Invalid file format. Expected a JSON array of users with firstName and lastName.",
            )
        })?;

        let mut imported = Vec::with_capacity(entries.len());
        let mut seen = HashSet::new();
        for (index, entry) in entries.iter().enumerate() {
            let first = entry.get("firstName").and_then(JsonValue::as_str);
            let last = entry.get("lastName").and_then(JsonValue::as_str);
            let (Some(first), Some(last)) = (first, last) else {
                return Err(Error::validation(format!(
                    "Invalid file format. Entry {} needs firstName and lastName.",
                    index + 1
                )));
            };
            let (first, last) = self.validate_names(first, last).map_err(|e| {
                Error::validation(format!("Entry {}: {}", index + 1, e))
            })?;
            if !seen.insert(ParticipantKey::new(first, last)) {
                return Err(Error::validation(format!(
                    "Entry {}: {} {} appears more than once",
                    index + 1,
                    first,
                    last
                )));
            }
            imported.push(Participant::new(first, last));
        }

        tracing::info!(count = imported.len(), "roster imported");
        self.participants = imported;
        self.persist();
        Ok(&self.participants)
    }

    /// Parse JSON text and import it
    pub fn import_json(&mut self, text: &str) -> Result<&[Participant]> {
        let raw: JsonValue = serde_json::from_str(text)
            .map_err(|_| Error::validation("Error parsing JSON file."))?;
        self.import_snapshot(&raw)
    }

    /// The roster including spoken flags
    pub fn export_snapshot(&self) -> Vec<Participant> {
        self.participants.clone()
    }

    /// The roster as pretty-printed JSON
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.participants)
            .map_err(|e| Error::validation(format!("Could not export roster: {}", e)))
    }
}
