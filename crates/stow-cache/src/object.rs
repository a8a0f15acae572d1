//! Two-tier object cache.
//!
//! Entries are bincode-encoded once and held as bytes. The memory tier keeps
//! up to `memory_capacity` entries and evicts the oldest insert first. The
//! disk tier keeps one framed file per key, named by the BLAKE3 hash of the
//! key; a file that fails its checksum reads as a miss.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::frame;

#[derive(Default)]
struct MemoryTier {
    entries: HashMap<String, Bytes>,
    order: VecDeque<String>,
    /// Bumped by every write, remove, and clear. A disk read is only
    /// promoted if no mutation happened while it was in flight.
    generation: u64,
}

impl MemoryTier {
    fn insert(&mut self, key: &str, value: Bytes, capacity: usize) {
        if capacity == 0 {
            return;
        }
        if self.entries.insert(key.to_string(), value).is_some() {
            self.order.retain(|k| k != key);
        }
        self.order.push_back(key.to_string());
        while self.order.len() > capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// A named key-value cache with a memory tier and an optional disk tier.
pub struct ObjectCache {
    config: CacheConfig,
    memory: Mutex<MemoryTier>,
}

impl ObjectCache {
    /// Open a cache, creating its disk directory if needed.
    pub fn open(config: CacheConfig) -> CacheResult<Self> {
        if config.name.is_empty() {
            return Err(CacheError::InvalidConfig("cache name is empty".into()));
        }
        if config.disk {
            fs::create_dir_all(&config.directory)?;
        }
        debug!(
            name = %config.name,
            directory = %config.directory.display(),
            disk = config.disk,
            "opened object cache"
        );
        Ok(Self {
            config,
            memory: Mutex::new(MemoryTier::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Entries currently held in memory.
    pub fn memory_len(&self) -> usize {
        self.memory.lock().expect("cache lock poisoned").entries.len()
    }

    /// Path of the disk entry for `key`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        let digest = blake3::hash(key.as_bytes());
        self.config.directory.join(hex::encode(digest.as_bytes()))
    }

    /// Read the encoded bytes for `key`, promoting disk hits into memory.
    pub fn get_raw(&self, key: &str) -> CacheResult<Option<Bytes>> {
        let generation = {
            let memory = self.memory.lock().expect("cache lock poisoned");
            if let Some(hit) = memory.entries.get(key) {
                return Ok(Some(hit.clone()));
            }
            memory.generation
        };
        if !self.config.disk {
            return Ok(None);
        }
        let payload = match self.read_disk(key) {
            Ok(Some(payload)) => payload,
            Ok(None) => return Ok(None),
            Err(err @ CacheError::Corrupt { .. }) => {
                warn!(key, error = %err, "corrupt cache entry; treating as miss");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let mut memory = self.memory.lock().expect("cache lock poisoned");
        if memory.generation != generation {
            // A write or remove raced this read; memory (or its absence) is newer.
            return Ok(memory.entries.get(key).cloned().or(Some(payload)));
        }
        memory.insert(key, payload.clone(), self.config.memory_capacity);
        Ok(Some(payload))
    }

    /// Store encoded bytes for `key` in every enabled tier.
    pub fn set_raw(&self, key: &str, value: Bytes) -> CacheResult<()> {
        if self.config.disk {
            self.write_disk(key, &value)?;
        }
        let mut memory = self.memory.lock().expect("cache lock poisoned");
        memory.insert(key, value, self.config.memory_capacity);
        memory.generation += 1;
        Ok(())
    }

    /// Remove `key` from every tier. Disk is cleared before memory.
    pub fn remove(&self, key: &str) -> CacheResult<()> {
        if self.config.disk {
            match fs::remove_file(self.entry_path(key)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        let mut memory = self.memory.lock().expect("cache lock poisoned");
        memory.remove(key);
        memory.generation += 1;
        Ok(())
    }

    /// Whether `key` is present in either tier.
    pub fn contains(&self, key: &str) -> CacheResult<bool> {
        Ok(self.get_raw(key)?.is_some())
    }

    /// Drop every entry from memory; keep the disk tier.
    pub fn clear_memory(&self) {
        let mut memory = self.memory.lock().expect("cache lock poisoned");
        memory.clear();
        memory.generation += 1;
    }

    /// Drop every entry from both tiers.
    pub fn clear(&self) -> CacheResult<()> {
        if self.config.disk {
            for entry in fs::read_dir(&self.config.directory)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    fs::remove_file(entry.path())?;
                }
            }
        }
        self.clear_memory();
        Ok(())
    }

    /// Decode the entry for `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.get_raw(key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Encode and store `value` at `key`.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> CacheResult<()> {
        let bytes = bincode::serialize(value)?;
        self.set_raw(key, Bytes::from(bytes))
    }

    fn read_disk(&self, key: &str) -> CacheResult<Option<Bytes>> {
        let path = self.entry_path(key);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match frame::decode(&raw) {
            Ok(payload) => Ok(Some(Bytes::copy_from_slice(payload))),
            Err(reason) => Err(CacheError::Corrupt { path, reason }),
        }
    }

    fn write_disk(&self, key: &str, payload: &[u8]) -> CacheResult<()> {
        let path = self.entry_path(key);
        let mut tmp = NamedTempFile::new_in(&self.config.directory)?;
        tmp.write_all(&frame::encode(payload))?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    }
}

impl std::fmt::Debug for ObjectCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectCache")
            .field("name", &self.config.name)
            .field("directory", &self.config.directory)
            .field("disk", &self.config.disk)
            .finish()
    }
}
