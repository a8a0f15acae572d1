//! In-memory preference store for tests and process-lifetime suites.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{PrefsError, PrefsResult};
use crate::primitive::Primitive;
use crate::traits::PreferenceStore;

/// A [`PreferenceStore`] backed by a `HashMap`. Data is lost when the store
/// is dropped.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<HashMap<String, Primitive>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned(e: impl std::fmt::Display) -> PrefsError {
    PrefsError::LockPoisoned(e.to_string())
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> PrefsResult<Option<Primitive>> {
        let values = self.values.read().map_err(poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Primitive) -> PrefsResult<()> {
        let mut values = self.values.write().map_err(poisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> PrefsResult<bool> {
        let mut values = self.values.write().map_err(poisoned)?;
        Ok(values.remove(key).is_some())
    }

    fn keys(&self) -> PrefsResult<Vec<String>> {
        let values = self.values.read().map_err(poisoned)?;
        let mut keys: Vec<String> = values.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryPreferenceStore::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", Primitive::Integer(1)).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(Primitive::Integer(1)));
        assert!(store.contains("a").unwrap());

        assert!(store.remove("a").unwrap());
        assert!(!store.remove("a").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn keys_are_sorted() {
        let store = MemoryPreferenceStore::new();
        for key in ["c", "a", "b"] {
            store.set(key, Primitive::Bool(true)).unwrap();
        }
        assert_eq!(store.keys().unwrap(), ["a", "b", "c"]);
        assert_eq!(store.len(), 3);
    }
}
