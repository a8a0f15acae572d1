//! In-memory backend used by this crate's unit tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::backend::{Backend, UnderlyingStorage};
use crate::error::{ConversionError, StorageError, StorageResult};

#[derive(Default)]
struct Shared {
    values: Mutex<HashMap<String, Value>>,
    fail_writes: AtomicBool,
    loads: AtomicUsize,
}

/// JSON-valued map keyed by name. Clones share storage.
#[derive(Clone)]
pub(crate) struct MemoryBackend {
    name: String,
    shared: Arc<Shared>,
}

impl MemoryBackend {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            shared: Arc::default(),
        }
    }

    pub fn put_json(&self, key: &str, value: Value) {
        self.shared
            .values
            .lock()
            .unwrap()
            .insert(key.to_string(), value);
    }

    pub fn get_json(&self, key: &str) -> Option<Value> {
        self.shared.values.lock().unwrap().get(key).cloned()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn loads(&self) -> usize {
        self.shared.loads.load(Ordering::SeqCst)
    }

    fn check_writable(&self, key: &str) -> StorageResult<()> {
        if self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::backend(key, "writes disabled"));
        }
        Ok(())
    }
}

impl PartialEq for MemoryBackend {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryBackend({})", self.name)
    }
}

impl UnderlyingStorage for MemoryBackend {
    fn make_default() -> Self {
        Self::named("default")
    }
}

impl<T: Serialize + DeserializeOwned> Backend<T> for MemoryBackend {
    fn load(&self, key: &str) -> StorageResult<Option<T>> {
        self.shared.loads.fetch_add(1, Ordering::SeqCst);
        match self.get_json(key) {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StorageError::decode::<T>(key, e)),
            None => Ok(None),
        }
    }

    fn store(&self, key: &str, value: &T) -> StorageResult<()> {
        let json = serde_json::to_value(value).map_err(|e| {
            StorageError::conversion::<T>(key, ConversionError::Encoding(e.to_string()))
        })?;
        self.check_writable(key)?;
        self.put_json(key, json);
        Ok(())
    }

    fn erase(&self, key: &str) -> StorageResult<()> {
        self.check_writable(key)?;
        self.shared.values.lock().unwrap().remove(key);
        Ok(())
    }
}
