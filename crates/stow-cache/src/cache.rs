//! The [`Cache`] backend handle.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use stow_core::{Backend, Binding, StorageError, StorageRef, StorageResult, UnderlyingStorage};
use tracing::warn;

use crate::config::CacheConfig;
use crate::error::CacheResult;
use crate::object::ObjectCache;

type Opened = Mutex<HashMap<(String, PathBuf), Arc<ObjectCache>>>;

fn opened() -> &'static Opened {
    static OPENED: OnceLock<Opened> = OnceLock::new();
    OPENED.get_or_init(Default::default)
}

fn shared() -> &'static RwLock<Cache> {
    static SHARED: OnceLock<RwLock<Cache>> = OnceLock::new();
    SHARED.get_or_init(|| RwLock::new(Cache::open(CacheConfig::default())))
}

/// A handle to an object cache that may be unavailable.
///
/// Opening a cache can fail (no writable directory, bad configuration). An
/// unavailable handle still works as a backend: every read is a miss and
/// every write is dropped.
#[derive(Clone)]
pub struct Cache {
    inner: Option<Arc<ObjectCache>>,
}

impl Cache {
    /// Open the cache described by `config`, or an unavailable handle if
    /// that fails. Opening the same name and directory twice shares one
    /// cache.
    pub fn open(config: CacheConfig) -> Self {
        match Self::try_open(config) {
            Ok(cache) => cache,
            Err(err) => {
                warn!(error = %err, "object cache unavailable");
                Self::unavailable()
            }
        }
    }

    /// Open the cache described by `config`.
    pub fn try_open(config: CacheConfig) -> CacheResult<Self> {
        let id = (config.name.clone(), config.directory.clone());
        let mut opened = opened().lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cache) = opened.get(&id) {
            return Ok(Self::from_cache(Arc::clone(cache)));
        }
        let cache = Arc::new(ObjectCache::open(config)?);
        opened.insert(id, Arc::clone(&cache));
        Ok(Self::from_cache(cache))
    }

    pub fn from_cache(cache: Arc<ObjectCache>) -> Self {
        Self { inner: Some(cache) }
    }

    pub fn unavailable() -> Self {
        Self { inner: None }
    }

    /// The process's shared cache; the default backend for cache
    /// references. Opened from [`CacheConfig::default`] on first use.
    pub fn shared() -> Self {
        shared()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the shared cache.
    pub fn set_shared(cache: Cache) {
        *shared().write().unwrap_or_else(PoisonError::into_inner) = cache;
    }

    pub fn is_available(&self) -> bool {
        self.inner.is_some()
    }

    pub fn object_cache(&self) -> Option<&Arc<ObjectCache>> {
        self.inner.as_ref()
    }
}

impl PartialEq for Cache {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (None, None) => true,
            (Some(a), Some(b)) => a.name() == b.name() && a.directory() == b.directory(),
            _ => false,
        }
    }
}

impl Eq for Cache {}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(cache) => write!(f, "Cache({})", cache.name()),
            None => write!(f, "Cache(unavailable)"),
        }
    }
}

impl UnderlyingStorage for Cache {
    fn make_default() -> Self {
        Self::shared()
    }
}

impl<T: Serialize + DeserializeOwned> Backend<T> for Cache {
    fn load(&self, key: &str) -> StorageResult<Option<T>> {
        let Some(cache) = &self.inner else {
            return Ok(None);
        };
        let raw = cache
            .get_raw(key)
            .map_err(|e| StorageError::backend(key, e))?;
        match raw {
            Some(bytes) => bincode::deserialize(&bytes)
                .map(Some)
                .map_err(|e| StorageError::decode::<T>(key, e)),
            None => Ok(None),
        }
    }

    fn store(&self, key: &str, value: &T) -> StorageResult<()> {
        let Some(cache) = &self.inner else {
            return Ok(());
        };
        let bytes = bincode::serialize(value).map_err(|e| {
            StorageError::conversion::<T>(key, stow_core::ConversionError::Encoding(e.to_string()))
        })?;
        cache
            .set_raw(key, bytes.into())
            .map_err(|e| StorageError::backend(key, e))
    }

    fn erase(&self, key: &str) -> StorageResult<()> {
        let Some(cache) = &self.inner else {
            return Ok(());
        };
        cache.remove(key).map_err(|e| StorageError::backend(key, e))
    }
}

/// The shared reference to a cached object.
pub type CacheRef<T> = StorageRef<Cache, T>;

/// A cached object with a default.
pub type CacheBinding<T> = Binding<Cache, T>;
