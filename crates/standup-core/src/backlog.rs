//! "Part B" backlog: follow-up topics parked until after the round

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::store::{read_json, write_json, Durability, SharedStore, Snapshot};
use crate::time::Millis;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A follow-up topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklogItem {
    /// Creation time in epoch ms, as text
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Owns the backlog list and keeps it persisted
pub struct BacklogEngine {
    items: IndexMap<String, BacklogItem>,
    store: SharedStore,
    config: Arc<SessionConfig>,
    durability: Durability,
}

impl BacklogEngine {
    /// Load the backlog; a missing or unreadable snapshot is an empty list
    pub fn load(store: SharedStore, config: Arc<SessionConfig>) -> Self {
        let mut engine = Self {
            items: IndexMap::new(),
            store,
            config,
            durability: Durability::default(),
        };

        match read_json::<Vec<BacklogItem>>(engine.store.as_ref(), &engine.config.keys.backlog) {
            Snapshot::Found(items) => {
                engine.items = items
                    .into_iter()
                    .map(|item| (item.id.clone(), item))
                    .collect();
            }
            Snapshot::Missing => {}
            Snapshot::Corrupt(reason) => {
                tracing::warn!(%reason, "saved backlog unreadable, starting empty");
            }
            Snapshot::Unavailable(e) => engine.durability.record("backlog", Err(e)),
        }

        engine
    }

    fn persist(&mut self) {
        let items: Vec<&BacklogItem> = self.items.values().collect();
        let result = write_json(self.store.as_ref(), &self.config.keys.backlog, &items);
        self.durability.record("backlog", result);
    }

    /// Items in insertion order
    pub fn items(&self) -> impl Iterator<Item = &BacklogItem> {
        self.items.values()
    }

    /// Look up an item by id
    pub fn get(&self, id: &str) -> Option<&BacklogItem> {
        self.items.get(id)
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the backlog is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of completed items
    pub fn completed_count(&self) -> usize {
        self.items.values().filter(|i| i.completed).count()
    }

    /// Whether the last write failed
    pub fn is_degraded(&self) -> bool {
        self.durability.is_degraded()
    }

    /// Add a topic created at `now`
    pub fn add(&mut self, text: &str, now: Millis) -> Result<&BacklogItem> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::validation("Please enter a topic for Part B"));
        }
        let max = self.config.max_topic_len;
        if text.chars().count() > max {
            return Err(Error::validation(format!(
                "Part B topic must be {} characters or less",
                max
            )));
        }
        let lowered = text.to_lowercase();
        if self.items.values().any(|i| i.text.to_lowercase() == lowered) {
            return Err(Error::duplicate("This topic already exists in Part B items"));
        }

        let mut stamp = now;
        while self.items.contains_key(&stamp.to_string()) {
            stamp += 1;
        }
        let id = stamp.to_string();
        let created_at = DateTime::<Utc>::from_timestamp_millis(now).unwrap_or_else(Utc::now);
        let (index, _) = self.items.insert_full(
            id.clone(),
            BacklogItem {
                id: id.clone(),
                text: text.to_string(),
                completed: false,
                created_at,
            },
        );
        tracing::debug!(%id, "backlog item added");
        self.persist();

        Ok(&self.items[index])
    }

    /// Remove an item, returning it if it existed
    pub fn remove(&mut self, id: &str) -> Option<BacklogItem> {
        let removed = self.items.shift_remove(id);
        if removed.is_some() {
            tracing::debug!(%id, "backlog item removed");
            self.persist();
        }
        removed
    }

    /// Flip the completed flag, returning the new value
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        let item = self.items.get_mut(id)?;
        item.completed = !item.completed;
        let completed = item.completed;
        self.persist();
        Some(completed)
    }

    /// Drop every completed item, returning how many were removed
    pub fn clear_completed(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|_, item| !item.completed);
        let removed = before - self.items.len();
        if removed > 0 {
            tracing::debug!(removed, "completed backlog items cleared");
            self.persist();
        }
        removed
    }
}
