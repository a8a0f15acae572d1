//! Single-instance typed storage references.
//!
//! Application code addresses persisted values by key. For any given backend
//! kind, value type, and key there is at most one live [`StorageRef`] in the
//! process; every holder shares it, so a write through one handle is visible
//! through all of them without re-reading the backend.
//!
//! # Layers
//!
//! - [`Backend<T>`] -- a store handle that can load, store, and erase values
//!   of type `T`. Concrete backends live in their own crates.
//! - [`Registry`] -- deduplicates references by `(reference type, key)`,
//!   holding only weak handles.
//! - [`StorageRef`] -- the shared cell. Reads through on construction,
//!   writes through on every change.
//! - [`Binding`] -- a reference plus a default value.
//! - [`Compose`] / [`Migrate`] -- fallback chains and legacy-key migration
//!   over anything implementing [`Storage`].
//!
//! # Design Rules
//!
//! 1. Construction reads the backend exactly once per live reference.
//! 2. Every content change is written through before the setter returns.
//! 3. Write failures are returned and reported to the registry's [`Hooks`];
//!    the in-memory content keeps the new value either way.
//! 4. A stored value that does not decode reads as absent.
//! 5. One key, one backend: looking up a live key against an unequal handle
//!    of the same kind is a programming error.

pub mod backend;
pub mod binding;
pub mod compose;
pub mod config;
pub mod error;
pub mod hooks;
pub mod reference;
pub mod registry;
pub mod storage;
pub mod trace;

#[cfg(test)]
mod testing;

// Re-export primary types at crate root for ergonomic imports.
pub use backend::{Backend, BackendExt, RawRepresentable, UnderlyingStorage};
pub use binding::Binding;
pub use compose::{Compose, Migrate};
pub use config::{RegistryConfig, DEFAULT_CLEANUP_THRESHOLD};
pub use error::{ConversionError, StorageError, StorageResult};
pub use hooks::{FailureHook, FailureReport, Hooks};
pub use reference::StorageRef;
pub use registry::{Registry, RegistryStats};
pub use storage::{AnyStorage, Storage, StorageExt};
pub use trace::{short_type_name, TraceEvent, TraceSink, Tracer};
