//! The shared, write-through cell bound to one key in one backend.

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

use crate::backend::Backend;
use crate::error::StorageResult;
use crate::hooks::{FailureReport, Hooks};
use crate::trace::{TraceEvent, Tracer};

/// Per-reference context inherited from the registry that built it.
#[derive(Clone, Debug)]
pub(crate) struct RefContext {
    pub type_name: String,
    pub tracer: Tracer,
    pub hooks: Hooks,
}

/// The single live reference for a `(backend kind, type, key)` slot.
///
/// Obtain one through [`Registry::get`](crate::Registry::get); every holder
/// of the same slot shares this instance, so a write through one handle is
/// immediately visible through all others.
///
/// Construction reads through the backend once. Every
/// [`set_content`](Self::set_content) writes through before returning.
///
/// The content lock only guards the in-memory value. Two threads writing
/// the same reference concurrently race at the backend exactly like a plain
/// shared cell would; callers that need ordering must serialize their own
/// writes.
pub struct StorageRef<B, T> {
    key: String,
    backend: B,
    content: RwLock<Option<T>>,
    context: RefContext,
}

impl<B, T> StorageRef<B, T>
where
    B: Backend<T>,
    T: Clone + Send + Sync + 'static,
{
    /// Build a reference and read its initial content. Only the registry
    /// calls this, with its lock held.
    pub(crate) fn hydrate(key: &str, backend: B, context: RefContext) -> Self {
        let content = match backend.load(key) {
            Ok(content) => content,
            Err(err) => {
                warn!(key, type_name = %context.type_name, error = %err, "stored value is unreadable; treating as absent");
                context.tracer.emit(|| TraceEvent::Failure {
                    type_name: context.type_name.clone(),
                    key: key.to_string(),
                    reason: err.to_string(),
                });
                None
            }
        };
        Self {
            key: key.to_string(),
            backend,
            content: RwLock::new(content),
            context,
        }
    }

    /// The key this reference is bound to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The backend this reference reads from and writes to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Short identifier of this reference's type, as used in trace lines.
    pub fn type_name(&self) -> &str {
        &self.context.type_name
    }

    /// A copy of the current content; `None` means absent from the backend.
    pub fn content(&self) -> Option<T> {
        self.read().clone()
    }

    /// Borrow the current content without cloning it.
    pub fn with_content<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.read().as_ref())
    }

    /// Whether the backend currently holds a value for this key.
    pub fn is_present(&self) -> bool {
        self.read().is_some()
    }

    /// Replace the content and write it through.
    ///
    /// `Some(value)` is converted and stored; `None` removes the key. The
    /// in-memory content is updated even when the write-through fails, in
    /// which case the error is reported to the registry's failure hook and
    /// returned. Memory is updated before the hook runs, so a hook that
    /// panics still leaves the new content in place.
    pub fn set_content(&self, content: Option<T>) -> StorageResult<()> {
        *self.write() = content.clone();
        self.write_through(content.as_ref())
    }

    /// Mutate present content in place and write the result through.
    ///
    /// Returns `Ok(false)` without calling `f` when the content is absent.
    ///
    /// # Deadlocks
    ///
    /// `f` runs while the content lock is held. It must not read or write
    /// this reference, or any handle to the same key and type.
    pub fn modify(&self, f: impl FnOnce(&mut T)) -> StorageResult<bool> {
        let updated = {
            let mut guard = self.write();
            match guard.as_mut() {
                Some(value) => {
                    f(value);
                    value.clone()
                }
                None => return Ok(false),
            }
        };
        self.write_through(Some(&updated)).map(|()| true)
    }

    /// Re-read the backend, replacing the in-memory content.
    ///
    /// Only needed when the store was changed behind the registry's back.
    pub fn refresh(&self) -> Option<T> {
        let content = self.backend.load(&self.key).unwrap_or_else(|err| {
            warn!(key = %self.key, error = %err, "stored value is unreadable; treating as absent");
            None
        });
        *self.write() = content.clone();
        content
    }

    fn write_through(&self, content: Option<&T>) -> StorageResult<()> {
        let result = match content {
            Some(value) => self.backend.store(&self.key, value),
            None => self.backend.erase(&self.key),
        };
        if let Err(err) = &result {
            self.context.tracer.emit(|| TraceEvent::Failure {
                type_name: self.context.type_name.clone(),
                key: self.key.clone(),
                reason: err.to_string(),
            });
            self.context.hooks.report(&FailureReport {
                type_name: self.context.type_name.clone(),
                backend: self.backend.describe(),
                error: err.clone(),
            });
        }
        result
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<T>> {
        self.content.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<T>> {
        self.content.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B, T> fmt::Debug for StorageRef<B, T>
where
    B: Backend<T>,
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] : {:?}",
            self.backend.describe(),
            self.key,
            *self.read()
        )
    }
}

impl<B, T> Drop for StorageRef<B, T> {
    fn drop(&mut self) {
        let context = &self.context;
        let key = &self.key;
        context.tracer.emit(|| TraceEvent::Clear {
            type_name: context.type_name.clone(),
            key: key.clone(),
        });
    }
}
