use serde::{Deserialize, Serialize};

/// Default number of per-type tables before the registry considers a sweep.
pub const DEFAULT_CLEANUP_THRESHOLD: usize = 10;

/// Configuration for a [`Registry`](crate::Registry).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Minimum number of per-type tables before a cleanup sweep may run.
    pub cleanup_threshold: usize,
    /// Whether lifecycle trace events are emitted.
    pub trace: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cleanup_threshold: DEFAULT_CLEANUP_THRESHOLD,
            trace: cfg!(debug_assertions),
        }
    }
}

impl RegistryConfig {
    /// A configuration that emits trace events regardless of build profile.
    pub fn traced() -> Self {
        Self {
            trace: true,
            ..Default::default()
        }
    }

    /// Set the cleanup threshold. A threshold of zero is treated as one.
    pub fn with_cleanup_threshold(mut self, threshold: usize) -> Self {
        self.cleanup_threshold = threshold.max(1);
        self
    }
}
