//! Error types for standup-core
//!
//! The `Display` text of each variant is what the popup shows the user, so
//! it is phrased as a message rather than a diagnostic.

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed or out-of-range user input. Recoverable by re-prompting.
    #[error("{0}")]
    Validation(String),

    /// A participant or topic with the same normalized label already exists.
    #[error("{0}")]
    Duplicate(String),

    /// The picker was asked to pick with nobody left to speak.
    #[error("Everyone has already spoken!")]
    EmptyPool,

    /// A picker operation needed a pick in flight and there is none.
    #[error("No pick in progress")]
    NoActivePick,

    /// The persistence layer failed or is missing.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Configuration could not be parsed or holds invalid values.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Create a duplicate error
    pub fn duplicate(message: impl Into<String>) -> Self {
        Error::Duplicate(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Error::StorageUnavailable(message.into())
    }

    /// True for errors caused by what the user typed or picked
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::Duplicate(_) | Error::EmptyPool | Error::NoActivePick
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_user_facing() {
        assert_eq!(Error::EmptyPool.to_string(), "Everyone has already spoken!");
        assert_eq!(
            Error::validation("Please enter both first and last name").to_string(),
            "Please enter both first and last name"
        );
    }

    #[test]
    fn test_user_error_classification() {
        assert!(Error::duplicate("x").is_user_error());
        assert!(!Error::storage("quota").is_user_error());
        assert!(!Error::Config("bad".into()).is_user_error());
    }
}
