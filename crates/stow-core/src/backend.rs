//! The seams between the registry and concrete storage engines.
//!
//! A backend handle implements [`UnderlyingStorage`] once, and
//! [`Backend<T>`] for every value type it can persist. Backend crates
//! usually provide the latter as a blanket impl over their own storable
//! trait, so the registry never needs to know how a value is encoded.

use std::fmt;
use std::sync::Arc;

use crate::error::StorageResult;
use crate::reference::StorageRef;
use crate::registry::Registry;

/// A handle to a concrete store.
///
/// Two handles must compare equal iff they address the same physical store
/// (same suite, same service, same cache directory), never by instance
/// identity. The registry relies on this to detect a key being used against
/// two different stores of the same kind.
pub trait UnderlyingStorage: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The process's canonical instance of this backend kind.
    fn make_default() -> Self;

    /// Description used in trace lines and failure reports.
    fn describe(&self) -> String {
        format!("{self:?}")
    }
}

/// Typed read/write access for values of type `T`.
pub trait Backend<T>: UnderlyingStorage {
    /// Read the value stored at `key`.
    ///
    /// Returns `Ok(None)` when nothing is stored and
    /// [`StorageError::Decode`](crate::StorageError::Decode) when something
    /// is stored but is not a `T`.
    fn load(&self, key: &str) -> StorageResult<Option<T>>;

    /// Convert `value` and write it to `key`.
    fn store(&self, key: &str, value: &T) -> StorageResult<()>;

    /// Remove whatever is stored at `key`.
    fn erase(&self, key: &str) -> StorageResult<()>;
}

/// A type represented by a raw value of another type, like a C-style enum
/// backed by an integer or a string.
///
/// Backend crates provide `impl_*_raw!` macros that make such a type
/// storable wherever its `Raw` type is.
pub trait RawRepresentable: Sized {
    type Raw;

    /// The underlying raw value.
    fn raw_value(&self) -> Self::Raw;

    /// Reconstruct from a raw value, or `None` if it names no valid case.
    fn from_raw_value(raw: Self::Raw) -> Option<Self>;
}

/// Key-addressed shortcuts against the global registry.
///
/// ```ignore
/// let sound = Preferences::standard().reference::<String>("catSound");
/// ```
pub trait BackendExt: UnderlyingStorage {
    /// The shared reference for `key` in this store.
    fn reference<T>(&self, key: &str) -> Arc<StorageRef<Self, T>>
    where
        Self: Backend<T>,
        T: Clone + Send + Sync + 'static,
    {
        Registry::global().get(self, key)
    }

    /// The current content at `key`.
    fn content<T>(&self, key: &str) -> Option<T>
    where
        Self: Backend<T>,
        T: Clone + Send + Sync + 'static,
    {
        self.reference::<T>(key).content()
    }

    /// Replace the content at `key`, writing through.
    fn set_content<T>(&self, key: &str, content: Option<T>) -> StorageResult<()>
    where
        Self: Backend<T>,
        T: Clone + Send + Sync + 'static,
    {
        self.reference::<T>(key).set_content(content)
    }
}

impl<B: UnderlyingStorage> BackendExt for B {}
