//! JSON-file preference store.
//!
//! The whole document is held in memory and rewritten on every mutation:
//! serialized to a temp file in the same directory, synced, then renamed
//! over the previous file. A crash mid-write leaves the previous document intact.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockWriteGuard};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{PrefsError, PrefsResult};
use crate::primitive::Primitive;
use crate::traits::PreferenceStore;

/// A [`PreferenceStore`] persisted as a single JSON document.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, Primitive>>,
}

impl FilePreferenceStore {
    /// Open the document at `path`, or start empty if it does not exist yet.
    ///
    /// The file (and its parent directory) is only created on first write.
    pub fn open(path: impl Into<PathBuf>) -> PrefsResult<Self> {
        let path = path.into();
        let values = match fs::read(&path) {
            Ok(raw) if raw.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = values.len(), "opened preferences file");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_values(&self) -> PrefsResult<RwLockWriteGuard<'_, BTreeMap<String, Primitive>>> {
        self.values
            .write()
            .map_err(|e| PrefsError::LockPoisoned(e.to_string()))
    }

    fn flush(&self, values: &BTreeMap<String, Primitive>) -> PrefsResult<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        let body = serde_json::to_vec_pretty(values)?;
        tmp.write_all(&body)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| PrefsError::Io(e.error))?;
        Ok(())
    }

    /// Apply `mutate`, flush, and roll the in-memory document back if the
    /// flush fails.
    fn mutate<R>(&self, key: &str, mutate: impl FnOnce(&mut BTreeMap<String, Primitive>) -> R) -> PrefsResult<R> {
        let mut values = self.write_values()?;
        let previous = values.get(key).cloned();
        let result = mutate(&mut values);
        if let Err(err) = self.flush(&values) {
            match previous {
                Some(value) => values.insert(key.to_string(), value),
                None => values.remove(key),
            };
            return Err(err);
        }
        Ok(result)
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> PrefsResult<Option<Primitive>> {
        let values = self
            .values
            .read()
            .map_err(|e| PrefsError::LockPoisoned(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Primitive) -> PrefsResult<()> {
        if !value.is_finite() {
            return Err(PrefsError::Unrepresentable {
                key: key.to_string(),
                reason: "non-finite float".into(),
            });
        }
        self.mutate(key, |values| {
            values.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> PrefsResult<bool> {
        self.mutate(key, |values| values.remove(key).is_some())
    }

    fn keys(&self) -> PrefsResult<Vec<String>> {
        let values = self
            .values
            .read()
            .map_err(|e| PrefsError::LockPoisoned(e.to_string()))?;
        Ok(values.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::open(dir.path().join("prefs.json")).unwrap();
        assert!(store.keys().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let store = FilePreferenceStore::open(&path).unwrap();
        store.set("catSound", Primitive::from("meow")).unwrap();
        store.set("lives", Primitive::Integer(9)).unwrap();
        store.remove("lives").unwrap();
        drop(store);

        let reopened = FilePreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.get("catSound").unwrap(), Some(Primitive::from("meow")));
        assert_eq!(reopened.get("lives").unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, b"{not json").unwrap();
        let err = FilePreferenceStore::open(&path).unwrap_err();
        assert!(matches!(err, PrefsError::Serialization(_)));
    }

    #[test]
    fn empty_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, b"\n").unwrap();
        assert!(FilePreferenceStore::open(&path).unwrap().keys().unwrap().is_empty());
    }

    #[test]
    fn non_finite_float_is_refused_and_document_survives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let store = FilePreferenceStore::open(&path).unwrap();
        store.set("catSound", Primitive::from("meow")).unwrap();

        let err = store.set("ratio", Primitive::Float(f64::NAN)).unwrap_err();
        assert!(matches!(err, PrefsError::Unrepresentable { .. }));
        let nested = Primitive::Array(vec![Primitive::Float(f64::INFINITY)]);
        assert!(store.set("ratios", nested).is_err());
        assert_eq!(store.get("ratio").unwrap(), None);
        drop(store);

        let reopened = FilePreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.get("catSound").unwrap(), Some(Primitive::from("meow")));
        assert_eq!(reopened.keys().unwrap(), ["catSound"]);
    }

    #[test]
    fn failed_flush_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the document should be makes the final rename fail.
        let path = dir.path().join("prefs.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupant"), b"x").unwrap();

        let blocked = FilePreferenceStore {
            path: path.clone(),
            values: RwLock::new(BTreeMap::new()),
        };
        assert!(blocked.set("k", Primitive::Bool(true)).is_err());
        assert_eq!(blocked.get("k").unwrap(), None);
    }
}
