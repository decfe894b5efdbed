//! Database models for persistent storage.

mod value;

pub use value::*;
