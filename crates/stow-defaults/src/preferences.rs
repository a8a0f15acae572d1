//! The [`Preferences`] backend handle.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use stow_core::{Backend, Binding, StorageError, StorageRef, StorageResult, UnderlyingStorage};
use tracing::debug;

use crate::error::PrefsResult;
use crate::file::FilePreferenceStore;
use crate::memory::MemoryPreferenceStore;
use crate::primitive::Primitive;
use crate::storable::PreferencesStorable;
use crate::traits::PreferenceStore;

/// Name of the suite the shared handle starts out as.
pub const STANDARD_SUITE: &str = "standard";

/// Which physical preference store a handle addresses.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PreferencesId {
    /// A named in-memory suite, shared by name within the process.
    Suite(String),
    /// A JSON document on disk.
    File(PathBuf),
}

type Engines = Mutex<HashMap<PreferencesId, Arc<dyn PreferenceStore>>>;

fn engines() -> &'static Engines {
    static ENGINES: OnceLock<Engines> = OnceLock::new();
    ENGINES.get_or_init(Default::default)
}

fn shared() -> &'static RwLock<Preferences> {
    static SHARED: OnceLock<RwLock<Preferences>> = OnceLock::new();
    SHARED.get_or_init(|| RwLock::new(Preferences::suite(STANDARD_SUITE)))
}

/// A handle to one preference store.
///
/// Handles compare equal when they address the same store: the same suite
/// name or the same file path. Opening the same suite or file twice yields
/// handles that share one engine.
#[derive(Clone)]
pub struct Preferences {
    id: PreferencesId,
    store: Arc<dyn PreferenceStore>,
}

impl Preferences {
    /// The in-memory suite called `name`.
    pub fn suite(name: &str) -> Self {
        let id = PreferencesId::Suite(name.to_string());
        let mut engines = engines().lock().unwrap_or_else(PoisonError::into_inner);
        let store = engines
            .entry(id.clone())
            .or_insert_with(|| Arc::new(MemoryPreferenceStore::new()))
            .clone();
        Self { id, store }
    }

    /// The JSON document at `path`, loading it on first open.
    pub fn open_file(path: impl AsRef<Path>) -> PrefsResult<Self> {
        let path = absolute(path.as_ref());
        let id = PreferencesId::File(path.clone());
        let mut engines = engines().lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(store) = engines.get(&id) {
            return Ok(Self {
                id,
                store: Arc::clone(store),
            });
        }
        let store: Arc<dyn PreferenceStore> = Arc::new(FilePreferenceStore::open(&path)?);
        engines.insert(id.clone(), Arc::clone(&store));
        Ok(Self { id, store })
    }

    /// Wrap a custom engine under an explicit identity.
    ///
    /// The caller is responsible for never using the same identity for two
    /// different engines.
    pub fn with_store(id: PreferencesId, store: Arc<dyn PreferenceStore>) -> Self {
        Self { id, store }
    }

    /// The process's shared handle; the default backend for preference
    /// references.
    pub fn standard() -> Self {
        shared()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the shared handle.
    ///
    /// References already bound to the previous shared handle keep using it.
    pub fn set_shared(preferences: Preferences) {
        debug!(preferences = ?preferences, "replacing shared preferences");
        *shared().write().unwrap_or_else(PoisonError::into_inner) = preferences;
    }

    pub fn id(&self) -> &PreferencesId {
        &self.id
    }

    /// Read a raw value, bypassing every reference.
    pub fn get_raw(&self, key: &str) -> PrefsResult<Option<Primitive>> {
        self.store.get(key)
    }

    /// Write a raw value, bypassing every reference.
    ///
    /// Live references to `key` do not see the change until refreshed.
    pub fn set_raw(&self, key: &str, value: Primitive) -> PrefsResult<()> {
        self.store.set(key, value)
    }

    /// Remove a raw value, bypassing every reference.
    pub fn remove_raw(&self, key: &str) -> PrefsResult<bool> {
        self.store.remove(key)
    }

    pub fn keys(&self) -> PrefsResult<Vec<String>> {
        self.store.keys()
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl PartialEq for Preferences {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Preferences {}

impl fmt::Debug for Preferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            PreferencesId::Suite(name) => write!(f, "Preferences({name})"),
            PreferencesId::File(path) => write!(f, "Preferences({})", path.display()),
        }
    }
}

impl UnderlyingStorage for Preferences {
    fn make_default() -> Self {
        Self::standard()
    }
}

impl<T: PreferencesStorable> Backend<T> for Preferences {
    fn load(&self, key: &str) -> StorageResult<Option<T>> {
        let raw = self
            .store
            .get(key)
            .map_err(|e| StorageError::backend(key, e))?;
        match raw {
            Some(raw) => T::from_preferences(raw)
                .map(Some)
                .map_err(|e| StorageError::decode::<T>(key, e)),
            None => Ok(None),
        }
    }

    fn store(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = value
            .to_preferences()
            .map_err(|e| StorageError::conversion::<T>(key, e))?;
        self.store
            .set(key, raw)
            .map_err(|e| StorageError::backend(key, e))
    }

    fn erase(&self, key: &str) -> StorageResult<()> {
        self.store
            .remove(key)
            .map(|_| ())
            .map_err(|e| StorageError::backend(key, e))
    }
}

/// The shared reference to a preference value.
pub type PreferencesRef<T> = StorageRef<Preferences, T>;

/// A preference value with a default.
pub type PreferencesBinding<T> = Binding<Preferences, T>;
