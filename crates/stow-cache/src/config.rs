use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Name of the default cache.
pub const DEFAULT_CACHE_NAME: &str = "default";

/// Default number of entries kept in the memory tier.
pub const DEFAULT_MEMORY_CAPACITY: usize = 256;

/// Configuration for an [`ObjectCache`](crate::ObjectCache).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Name of the cache. Part of its identity.
    pub name: String,
    /// Directory of the disk tier. Part of its identity.
    pub directory: PathBuf,
    /// Maximum entries held in memory. Zero disables the memory tier.
    pub memory_capacity: usize,
    /// Whether entries are also written to disk.
    pub disk: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::named(DEFAULT_CACHE_NAME)
    }
}

impl CacheConfig {
    /// A disk-backed cache under the system temp directory.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            directory: std::env::temp_dir().join("stow-cache").join(name),
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            disk: true,
        }
    }

    /// A cache that never touches disk.
    pub fn memory_only(name: &str) -> Self {
        Self {
            disk: false,
            ..Self::named(name)
        }
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    pub fn with_memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = capacity;
        self
    }
}
