use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::StorageError;

/// Context handed to a [`FailureHook`] when a write-through fails.
#[derive(Debug, Clone)]
pub struct FailureReport {
    /// Short identifier of the reference type that failed.
    pub type_name: String,
    /// Description of the backend the write was aimed at.
    pub backend: String,
    /// The failure itself.
    pub error: StorageError,
}

/// Callback invoked on conversion and storage failures.
pub type FailureHook = Arc<dyn Fn(&FailureReport) + Send + Sync>;

/// Overridable failure handling for references created by one registry.
#[derive(Clone)]
pub struct Hooks {
    /// Invoked for every failed write-through or remove.
    pub on_failure: FailureHook,
}

impl Hooks {
    /// Log the failure and, in debug builds, panic.
    pub fn assert_on_failure() -> Self {
        Self {
            on_failure: Arc::new(|report: &FailureReport| {
                tracing::error!(
                    type_name = %report.type_name,
                    backend = %report.backend,
                    key = report.error.key(),
                    error = %report.error,
                    "write-through failed"
                );
                if cfg!(debug_assertions) {
                    panic!(
                        "{} in {} failed: {}",
                        report.type_name, report.backend, report.error
                    );
                }
            }),
        }
    }

    /// Log the failure and carry on.
    pub fn log_only() -> Self {
        Self {
            on_failure: Arc::new(|report: &FailureReport| {
                tracing::warn!(
                    type_name = %report.type_name,
                    backend = %report.backend,
                    error = %report.error,
                    "write-through failed"
                );
            }),
        }
    }

    /// Collect every report into the returned buffer.
    pub fn recording() -> (Self, Arc<Mutex<Vec<FailureReport>>>) {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);
        let hooks = Self {
            on_failure: Arc::new(move |report: &FailureReport| {
                sink.lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(report.clone());
            }),
        };
        (hooks, reports)
    }

    /// Wrap an arbitrary closure.
    pub fn with_failure_hook(hook: impl Fn(&FailureReport) + Send + Sync + 'static) -> Self {
        Self {
            on_failure: Arc::new(hook),
        }
    }

    pub(crate) fn report(&self, report: &FailureReport) {
        (self.on_failure)(report);
    }
}

impl Default for Hooks {
    fn default() -> Self {
        Self::assert_on_failure()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}
