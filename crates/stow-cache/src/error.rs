//! Error types for object cache operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by an [`ObjectCache`](crate::ObjectCache).
#[derive(Debug, Error)]
pub enum CacheError {
    /// The disk tier could not be read or written.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An on-disk entry failed its length or checksum check.
    #[error("corrupt cache entry {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The configuration cannot produce a working cache.
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),
}

impl From<bincode::Error> for CacheError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience type alias for object cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;
