//! Error types for secret store operations.

use thiserror::Error;

/// Errors raised by a [`SecretStore`](crate::SecretStore) engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecretError {
    /// The store refused the operation.
    #[error("access denied for '{key}': {reason}")]
    AccessDenied { key: String, reason: String },

    /// A secret was requested as a string but is not valid UTF-8.
    #[error("secret '{key}' is not valid UTF-8")]
    InvalidUtf8 { key: String },

    /// An engine lock was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Convenience type alias for secret store operations.
pub type SecretResult<T> = std::result::Result<T, SecretError>;
