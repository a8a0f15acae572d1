//! The process-wide map from `(reference type, key)` to a live reference.
//!
//! The registry holds only weak handles. Application code keeps the strong
//! [`Arc`]s; once the last one is dropped the slot expires and is reclaimed
//! by an amortized sweep. Lookup, construction, and sweeping all happen
//! under one mutex, so two threads racing for the same missing key never
//! both construct (and both read through).

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use crate::backend::Backend;
use crate::binding::Binding;
use crate::config::RegistryConfig;
use crate::error::{StorageError, StorageResult};
use crate::hooks::Hooks;
use crate::reference::{RefContext, StorageRef};
use crate::trace::{short_type_name, TraceEvent, TraceSink, Tracer};

type ErasedRef = dyn Any + Send + Sync;

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Weak slots for one reference type, keyed by storage key.
struct TypeTable {
    type_name: String,
    slots: HashMap<String, Weak<ErasedRef>>,
    /// Slot count at which dead slots are pruned on the next insert.
    next_prune_at: usize,
}

impl TypeTable {
    fn new(type_name: String) -> Self {
        Self {
            type_name,
            slots: HashMap::new(),
            next_prune_at: 0,
        }
    }

    fn live<B, T>(&self, key: &str) -> Option<Arc<StorageRef<B, T>>>
    where
        B: Backend<T>,
        T: Clone + Send + Sync + 'static,
    {
        let erased = self.slots.get(key)?.upgrade()?;
        erased.downcast::<StorageRef<B, T>>().ok()
    }

    fn prune(&mut self) {
        self.slots.retain(|_, slot| slot.strong_count() > 0);
    }

    fn live_count(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }
}

#[derive(Default)]
struct Tables {
    tables: HashMap<TypeId, TypeTable>,
    /// Table count at which the next sweep may run.
    next_sweep_at: usize,
}

/// Point-in-time occupancy of a [`Registry`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Per-type tables currently allocated.
    pub tables: usize,
    /// Tables holding at least one live reference.
    pub live_tables: usize,
    /// Tables whose every reference has been dropped.
    pub wasted_tables: usize,
    /// Live references across all tables.
    pub live_references: usize,
}

/// Deduplicating registry of [`StorageRef`]s.
///
/// Use [`Registry::global`] for the process-wide instance, or construct a
/// private one (tests, isolated subsystems).
pub struct Registry {
    state: Mutex<Tables>,
    cleanup_threshold: AtomicUsize,
    tracer: Tracer,
    hooks: Hooks,
}

impl Registry {
    /// Create a registry with the default (asserting) failure hooks.
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_hooks(config, Hooks::default())
    }

    /// Create a registry with custom failure hooks.
    pub fn with_hooks(config: RegistryConfig, hooks: Hooks) -> Self {
        Self {
            state: Mutex::new(Tables::default()),
            cleanup_threshold: AtomicUsize::new(config.cleanup_threshold.max(1)),
            tracer: Tracer::new(config.trace, None),
            hooks,
        }
    }

    /// Also deliver trace events to `sink`. Has no effect when tracing is
    /// disabled in the configuration.
    pub fn trace_to(mut self, sink: TraceSink) -> Self {
        self.tracer = Tracer::new(self.tracer.is_enabled(), Some(sink));
        self
    }

    /// The process-wide registry, created with defaults on first use.
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(|| Registry::new(RegistryConfig::default()))
    }

    /// Install `registry` as the process-wide instance.
    ///
    /// Fails, handing the registry back, if the global registry was already
    /// initialized (explicitly or by a prior [`Registry::global`] call).
    pub fn install_global(registry: Registry) -> Result<&'static Registry, Registry> {
        GLOBAL.set(registry)?;
        Ok(Self::global())
    }

    /// Minimum number of per-type tables before a sweep may run.
    pub fn cleanup_threshold(&self) -> usize {
        self.cleanup_threshold.load(Ordering::Relaxed)
    }

    /// Change the cleanup threshold. Zero is treated as one.
    pub fn set_cleanup_threshold(&self, threshold: usize) {
        self.cleanup_threshold
            .store(threshold.max(1), Ordering::Relaxed);
    }

    /// The shared reference for `key` in `backend`.
    ///
    /// # Panics
    ///
    /// Panics if a live reference for the same key and type is bound to a
    /// backend handle unequal to `backend`. Keys must be partitioned per
    /// physical store; see [`Registry::try_get`] for the non-panicking form.
    pub fn get<B, T>(&self, backend: &B, key: &str) -> Arc<StorageRef<B, T>>
    where
        B: Backend<T>,
        T: Clone + Send + Sync + 'static,
    {
        self.try_get(backend, key)
            .unwrap_or_else(|err| panic!("storage identity violation: {err}"))
    }

    /// The shared reference for `key` in the backend's default instance.
    pub fn get_default<B, T>(&self, key: &str) -> Arc<StorageRef<B, T>>
    where
        B: Backend<T>,
        T: Clone + Send + Sync + 'static,
    {
        self.get(&B::make_default(), key)
    }

    /// Look up or construct the reference for `key` in `backend`.
    ///
    /// Returns the existing live reference when there is one; otherwise
    /// constructs a new one, reading through the backend once.
    pub fn try_get<B, T>(&self, backend: &B, key: &str) -> StorageResult<Arc<StorageRef<B, T>>>
    where
        B: Backend<T>,
        T: Clone + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<StorageRef<B, T>>();
        let mut state = self.lock();

        if !state.tables.contains_key(&type_id) {
            self.clean_up_if_needed(&mut state);
        }
        let tracer = &self.tracer;
        let table = state.tables.entry(type_id).or_insert_with(|| {
            let name = short_type_name(type_name::<StorageRef<B, T>>());
            tracer.emit(|| TraceEvent::Alloc {
                type_name: name.clone(),
            });
            TypeTable::new(name)
        });

        if let Some(existing) = table.live::<B, T>(key) {
            if existing.backend() != backend {
                return Err(StorageError::IdentityViolation {
                    key: key.to_string(),
                    type_name: table.type_name.clone(),
                    existing: existing.backend().describe(),
                    requested: backend.describe(),
                });
            }
            tracer.emit(|| TraceEvent::Fetch {
                type_name: table.type_name.clone(),
                key: key.to_string(),
                backend: backend.describe(),
            });
            return Ok(existing);
        }

        let threshold = self.cleanup_threshold();
        if table.slots.len() >= threshold.max(table.next_prune_at) {
            table.prune();
            table.next_prune_at = threshold.max(table.slots.len() * 2);
        }

        let context = RefContext {
            type_name: table.type_name.clone(),
            tracer: self.tracer.clone(),
            hooks: self.hooks.clone(),
        };
        let created = Arc::new(StorageRef::hydrate(key, backend.clone(), context));
        let erased: Arc<ErasedRef> = created.clone();
        table.slots.insert(key.to_string(), Arc::downgrade(&erased));
        tracer.emit(|| TraceEvent::Create {
            type_name: table.type_name.clone(),
            key: key.to_string(),
            backend: backend.describe(),
        });
        Ok(created)
    }

    /// Build a [`Binding`] over the shared reference for `key`.
    ///
    /// When `persist_default` is set and the backend holds nothing, the
    /// default is written through immediately.
    pub fn bind<B, T>(
        &self,
        backend: &B,
        key: &str,
        make_default: impl Fn() -> T + Send + Sync + 'static,
        persist_default: bool,
    ) -> Binding<B, T>
    where
        B: Backend<T>,
        T: Clone + Send + Sync + 'static,
    {
        Binding::new(self.get(backend, key), make_default, persist_default)
    }

    /// Current occupancy.
    pub fn stats(&self) -> RegistryStats {
        let state = self.lock();
        let mut stats = RegistryStats {
            tables: state.tables.len(),
            ..Default::default()
        };
        for table in state.tables.values() {
            let live = table.live_count();
            stats.live_references += live;
            if live == 0 {
                stats.wasted_tables += 1;
            } else {
                stats.live_tables += 1;
            }
        }
        stats
    }

    /// Sweep now, regardless of the threshold. Returns the number of
    /// per-type tables removed.
    pub fn purge(&self) -> usize {
        let mut state = self.lock();
        self.sweep(&mut state)
    }

    fn clean_up_if_needed(&self, state: &mut Tables) {
        let threshold = self.cleanup_threshold();
        if state.tables.len() < threshold.max(state.next_sweep_at) {
            return;
        }
        self.sweep(state);
    }

    fn sweep(&self, state: &mut Tables) -> usize {
        let before = state.tables.len();
        self.tracer.emit(|| TraceEvent::CleanStart { tables: before });
        for table in state.tables.values_mut() {
            table.prune();
        }
        state.tables.retain(|_, table| !table.slots.is_empty());
        let after = state.tables.len();
        self.tracer.emit(|| TraceEvent::CleanAfter { tables: after });
        state.next_sweep_at = self.cleanup_threshold().max(after * 2);
        before - after
    }

    // A failure hook that panics while the lock is held poisons it; the
    // tables are still consistent, so keep going.
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("Registry")
            .field("tables", &stats.tables)
            .field("live_references", &stats.live_references)
            .field("cleanup_threshold", &self.cleanup_threshold())
            .finish()
    }
}
