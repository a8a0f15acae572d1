use std::fmt;
use std::ops::Add;
use std::sync::Arc;

use tracing::debug;

use crate::backend::Backend;
use crate::compose::Compose;
use crate::error::StorageResult;
use crate::reference::StorageRef;
use crate::registry::Registry;
use crate::storage::Storage;

type DefaultFn<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// A shared reference plus a default for when the backend holds nothing.
///
/// Bindings are cheap handles: cloning one clones the default thunk and the
/// [`Arc`] to the shared [`StorageRef`], so every binding to the same key
/// sees the same content. The default itself is never shared; it is
/// evaluated on each miss.
///
/// ```ignore
/// let sound = Binding::for_key(&Preferences::standard(), "catSound", || "nyan".to_string(), true);
/// assert_eq!(sound.get(), "nyan");
/// sound.set("meow".to_string())?;
/// ```
pub struct Binding<B, T> {
    reference: Arc<StorageRef<B, T>>,
    make_default: DefaultFn<T>,
    persist_default: bool,
}

impl<B, T> Binding<B, T>
where
    B: Backend<T>,
    T: Clone + Send + Sync + 'static,
{
    /// Wrap an existing reference.
    ///
    /// With `persist_default` set, an absent value is replaced by the default
    /// right away, and again on any later miss.
    pub fn new(
        reference: Arc<StorageRef<B, T>>,
        make_default: impl Fn() -> T + Send + Sync + 'static,
        persist_default: bool,
    ) -> Self {
        let binding = Self {
            reference,
            make_default: Arc::new(make_default),
            persist_default,
        };
        if persist_default && !binding.reference.is_present() {
            binding.persist((binding.make_default)());
        }
        binding
    }

    /// Bind `key` in `backend` through the global registry.
    pub fn for_key(
        backend: &B,
        key: &str,
        make_default: impl Fn() -> T + Send + Sync + 'static,
        persist_default: bool,
    ) -> Self {
        Registry::global().bind(backend, key, make_default, persist_default)
    }

    /// Bind `key` in the backend's default instance through the global
    /// registry.
    pub fn with_default_backend(
        key: &str,
        make_default: impl Fn() -> T + Send + Sync + 'static,
        persist_default: bool,
    ) -> Self {
        Self::for_key(&B::make_default(), key, make_default, persist_default)
    }

    pub fn reference(&self) -> &Arc<StorageRef<B, T>> {
        &self.reference
    }

    pub fn key(&self) -> &str {
        self.reference.key()
    }

    pub fn backend(&self) -> &B {
        self.reference.backend()
    }

    pub fn persists_default(&self) -> bool {
        self.persist_default
    }

    /// A freshly computed default, ignoring any stored value.
    pub fn default_value(&self) -> T {
        (self.make_default)()
    }

    // The reference has already reported a failed write to the hooks.
    fn persist(&self, value: T) {
        if let Err(err) = self.reference.set_content(Some(value)) {
            debug!(key = %self.key(), error = %err, "default not persisted");
        }
    }
}

impl<B, T> Storage for Binding<B, T>
where
    B: Backend<T>,
    T: Clone + Send + Sync + 'static,
{
    type Content = T;

    fn content(&self) -> Option<T> {
        self.reference.content()
    }

    fn set_content(&self, content: Option<T>) -> StorageResult<()> {
        self.reference.set_content(content)
    }

    fn get(&self) -> T {
        if let Some(value) = self.reference.content() {
            return value;
        }
        let value = self.default_value();
        if self.persist_default {
            self.persist(value.clone());
        }
        value
    }
}

impl<B, T> Clone for Binding<B, T> {
    fn clone(&self) -> Self {
        Self {
            reference: Arc::clone(&self.reference),
            make_default: Arc::clone(&self.make_default),
            persist_default: self.persist_default,
        }
    }
}

impl<B, T> fmt::Debug for Binding<B, T>
where
    B: Backend<T>,
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.reference, f)
    }
}

impl<B, T, Rhs> Add<Rhs> for Binding<B, T>
where
    B: Backend<T>,
    T: Clone + Send + Sync + 'static,
    Rhs: Storage<Content = T>,
{
    type Output = Compose<Self, Rhs>;

    fn add(self, rhs: Rhs) -> Self::Output {
        Compose::new(self, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::hooks::Hooks;
    use crate::testing::MemoryBackend;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> Registry {
        Registry::with_hooks(RegistryConfig::default(), Hooks::log_only())
    }

    // -----------------------------------------------------------------------
    // Defaults
    // -----------------------------------------------------------------------

    #[test]
    fn default_is_returned_without_writing() {
        let registry = registry();
        let backend = MemoryBackend::named("prefs");
        let binding = registry.bind(&backend, "greeting", || "hello".to_string(), false);

        assert_eq!(binding.get(), "hello");
        assert_eq!(binding.content(), None);
        assert_eq!(backend.get_json("greeting"), None);
    }

    #[test]
    fn persisting_default_writes_on_construction() {
        let registry = registry();
        let backend = MemoryBackend::named("prefs");
        let binding = registry.bind(&backend, "greeting", || "hello".to_string(), true);

        assert_eq!(backend.get_json("greeting"), Some(json!("hello")));
        assert_eq!(binding.get(), "hello");
    }

    #[test]
    fn persisting_default_rewrites_after_remove() {
        let registry = registry();
        let backend = MemoryBackend::named("prefs");
        let binding = registry.bind(&backend, "n", || 3_u32, true);

        binding.remove().unwrap();
        assert_eq!(backend.get_json("n"), None);
        assert_eq!(binding.get(), 3);
        assert_eq!(backend.get_json("n"), Some(json!(3)));
    }

    #[test]
    fn stored_value_wins_over_default() {
        let registry = registry();
        let backend = MemoryBackend::named("prefs");
        backend.put_json("greeting", json!("hi"));
        let binding = registry.bind(&backend, "greeting", || "hello".to_string(), true);
        assert_eq!(binding.get(), "hi");
        assert_eq!(backend.get_json("greeting"), Some(json!("hi")));
    }

    #[test]
    fn default_is_evaluated_per_miss() {
        let registry = registry();
        let backend = MemoryBackend::named("prefs");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let binding = registry.bind(
            &backend,
            "n",
            move || counter.fetch_add(1, Ordering::SeqCst) as u64,
            false,
        );

        assert_eq!(binding.get(), 0);
        assert_eq!(binding.get(), 1);
        binding.set(40).unwrap();
        assert_eq!(binding.get(), 40);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    // -----------------------------------------------------------------------
    // Sharing
    // -----------------------------------------------------------------------

    #[test]
    fn bindings_to_one_key_share_content() {
        let registry = registry();
        let backend = MemoryBackend::named("prefs");
        let first = registry.bind(&backend, "k", || "a".to_string(), true);
        let second = registry.bind(&backend, "k", || "b".to_string(), false);

        assert!(Arc::ptr_eq(first.reference(), second.reference()));
        first.set("shared".to_string()).unwrap();
        assert_eq!(second.get(), "shared");
        assert!(!second.persists_default());
        assert_eq!(second.default_value(), "b");
    }

    #[test]
    fn failed_default_persist_is_reported_not_raised() {
        let (hooks, reports) = Hooks::recording();
        let registry = Registry::with_hooks(RegistryConfig::default(), hooks);
        let backend = MemoryBackend::named("prefs");
        backend.fail_writes(true);

        let binding = registry.bind(&backend, "k", || "d".to_string(), true);
        assert_eq!(binding.get(), "d");
        assert_eq!(backend.get_json("k"), None);
        assert!(!reports.lock().unwrap().is_empty());
    }

    #[test]
    fn debug_delegates_to_reference() {
        let registry = registry();
        let backend = MemoryBackend::named("prefs");
        let binding = registry.bind(&backend, "k", || 1_i32, true);
        assert_eq!(format!("{binding:?}"), "MemoryBackend(prefs)[k] : Some(1)");
        assert_eq!(binding.key(), "k");
        assert_eq!(binding.backend(), &backend);
    }
}
