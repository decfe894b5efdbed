//! Standup DB - Durable key-value store using native_db
//!
//! Implements `standup_core::PersistentStore` for native hosts, where there
//! is no browser `localStorage`. Each key is one row; values are the same
//! strings the popup would keep in `localStorage`, so snapshots can be moved
//! between hosts unchanged.

mod error;
mod models;
mod store;

pub use error::{Error, Result};
pub use models::StoredValue;
pub use store::KvStore;
