//! The uniform read/write surface shared by bindings and combinators.

use std::fmt;
use std::ops::Add;

use crate::compose::{Compose, Migrate};
use crate::error::StorageResult;

/// Something that holds an optional value and can produce a value on demand.
///
/// [`content`](Self::content) is what is actually stored; [`get`](Self::get)
/// never fails to produce a value, falling back to a default. The trait is
/// object safe; see [`AnyStorage`].
pub trait Storage {
    type Content: Clone;

    /// The stored value, if any.
    fn content(&self) -> Option<Self::Content>;

    /// Replace the stored value; `None` removes it.
    fn set_content(&self, content: Option<Self::Content>) -> StorageResult<()>;

    /// The stored value, or a default when nothing is stored.
    fn get(&self) -> Self::Content;

    /// Store `value`.
    fn set(&self, value: Self::Content) -> StorageResult<()> {
        self.set_content(Some(value))
    }

    /// Remove the stored value.
    fn remove(&self) -> StorageResult<()> {
        self.set_content(None)
    }
}

/// Combinator constructors for every [`Storage`].
pub trait StorageExt: Storage + Sized {
    /// Read from `self`, falling back to `fallback`; write to both.
    fn or<S>(self, fallback: S) -> Compose<Self, S>
    where
        S: Storage<Content = Self::Content>,
    {
        Compose::new(self, fallback)
    }

    /// Read `self`, or else inherit `legacy`'s value converted by `convert`.
    ///
    /// Writes only ever reach `self`; `legacy` is never modified.
    fn migrate_from<L, F>(self, legacy: L, convert: F) -> Compose<Self, Migrate<L, F, Self::Content>>
    where
        L: Storage,
        F: Fn(L::Content) -> Self::Content,
    {
        Compose::new(self, Migrate::new(legacy, convert))
    }

    /// Erase the concrete type.
    fn boxed(self) -> AnyStorage<Self::Content>
    where
        Self: Send + Sync + 'static,
    {
        AnyStorage::new(self)
    }
}

impl<S: Storage> StorageExt for S {}

/// A type-erased [`Storage`] with content type `T`.
///
/// Lets heterogeneous chains (a binding, a composition, a migration) share
/// one field type.
pub struct AnyStorage<T> {
    inner: Box<dyn Storage<Content = T> + Send + Sync>,
}

impl<T: Clone> AnyStorage<T> {
    pub fn new(storage: impl Storage<Content = T> + Send + Sync + 'static) -> Self {
        Self {
            inner: Box::new(storage),
        }
    }
}

impl<T: Clone> Storage for AnyStorage<T> {
    type Content = T;

    fn content(&self) -> Option<T> {
        self.inner.content()
    }

    fn set_content(&self, content: Option<T>) -> StorageResult<()> {
        self.inner.set_content(content)
    }

    fn get(&self) -> T {
        self.inner.get()
    }

    fn set(&self, value: T) -> StorageResult<()> {
        self.inner.set(value)
    }

    fn remove(&self) -> StorageResult<()> {
        self.inner.remove()
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for AnyStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyStorage")
            .field("content", &self.inner.content())
            .finish()
    }
}

impl<T: Clone, Rhs> Add<Rhs> for AnyStorage<T>
where
    Rhs: Storage<Content = T>,
{
    type Output = Compose<Self, Rhs>;

    fn add(self, rhs: Rhs) -> Self::Output {
        Compose::new(self, rhs)
    }
}
