//! Error types for preference store operations.

use thiserror::Error;

/// Errors raised by a [`PreferenceStore`](crate::PreferenceStore) engine.
#[derive(Debug, Error)]
pub enum PrefsError {
    /// The backing file could not be read or written.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file holds something other than a preferences document.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The value has no representation in the engine's storage format.
    #[error("cannot store '{key}': {reason}")]
    Unrepresentable { key: String, reason: String },

    /// An engine lock was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<serde_json::Error> for PrefsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience type alias for preference store operations.
pub type PrefsResult<T> = std::result::Result<T, PrefsError>;
