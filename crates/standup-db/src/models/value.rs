//! Key-value model for database storage.

use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

/// A stored string value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct StoredValue {
    /// Primary key - the store key (e.g. "scrumUsers").
    #[primary_key]
    pub key: String,
    /// Raw value as written by the engine.
    pub value: String,
}

impl StoredValue {
    /// Create a new key-value row.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
