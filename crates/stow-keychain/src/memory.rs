//! In-memory secret store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use bytes::Bytes;
use tracing::debug;

use crate::error::{SecretError, SecretResult};
use crate::traits::SecretStore;

/// A [`SecretStore`] held in process memory.
///
/// Can be switched to read-only, after which every mutation fails with
/// [`SecretError::AccessDenied`], like a locked keychain.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    items: RwLock<HashMap<String, Bytes>>,
    read_only: AtomicBool,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock or unlock the store for writing.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::SeqCst)
    }

    fn check_writable(&self, key: &str) -> SecretResult<()> {
        if self.is_read_only() {
            return Err(SecretError::AccessDenied {
                key: key.to_string(),
                reason: "store is read-only".into(),
            });
        }
        Ok(())
    }

    fn insert(&self, key: &str, value: Bytes) -> SecretResult<()> {
        self.check_writable(key)?;
        let mut items = self
            .items
            .write()
            .map_err(|e| SecretError::LockPoisoned(e.to_string()))?;
        debug!(key, len = value.len(), "secret stored");
        items.insert(key.to_string(), value);
        Ok(())
    }
}

impl SecretStore for MemorySecretStore {
    fn get_string(&self, key: &str) -> SecretResult<Option<String>> {
        match self.get_bytes(key)? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|_| SecretError::InvalidUtf8 {
                    key: key.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn get_bytes(&self, key: &str) -> SecretResult<Option<Bytes>> {
        let items = self
            .items
            .read()
            .map_err(|e| SecretError::LockPoisoned(e.to_string()))?;
        Ok(items.get(key).cloned())
    }

    fn set_string(&self, key: &str, value: &str) -> SecretResult<()> {
        self.insert(key, Bytes::copy_from_slice(value.as_bytes()))
    }

    fn set_bytes(&self, key: &str, value: &[u8]) -> SecretResult<()> {
        self.insert(key, Bytes::copy_from_slice(value))
    }

    fn remove(&self, key: &str) -> SecretResult<()> {
        self.check_writable(key)?;
        let mut items = self
            .items
            .write()
            .map_err(|e| SecretError::LockPoisoned(e.to_string()))?;
        if items.remove(key).is_some() {
            debug!(key, "secret removed");
        }
        Ok(())
    }

    fn remove_all(&self) -> SecretResult<()> {
        self.check_writable("*")?;
        let mut items = self
            .items
            .write()
            .map_err(|e| SecretError::LockPoisoned(e.to_string()))?;
        debug!(count = items.len(), "secrets cleared");
        items.clear();
        Ok(())
    }

    fn keys(&self) -> SecretResult<Vec<String>> {
        let items = self
            .items
            .read()
            .map_err(|e| SecretError::LockPoisoned(e.to_string()))?;
        let mut keys: Vec<String> = items.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
