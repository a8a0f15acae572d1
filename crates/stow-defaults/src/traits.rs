//! The [`PreferenceStore`] trait defining the raw preference engine.

use crate::error::PrefsResult;
use crate::primitive::Primitive;

/// A string-keyed map of [`Primitive`]s.
///
/// Implementations must be thread-safe (`Send + Sync`). Every mutation is
/// durable by the time it returns, to whatever degree the engine is durable
/// at all.
pub trait PreferenceStore: Send + Sync {
    /// Read the value at `key`.
    ///
    /// Returns `Ok(None)` if nothing is stored.
    fn get(&self, key: &str) -> PrefsResult<Option<Primitive>>;

    /// Store `value` at `key`, replacing any previous value.
    fn set(&self, key: &str, value: Primitive) -> PrefsResult<()>;

    /// Remove the value at `key`.
    ///
    /// Returns `Ok(true)` if a value existed.
    fn remove(&self, key: &str) -> PrefsResult<bool>;

    /// All keys, sorted.
    fn keys(&self) -> PrefsResult<Vec<String>>;

    /// Whether a value is stored at `key`.
    fn contains(&self, key: &str) -> PrefsResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
