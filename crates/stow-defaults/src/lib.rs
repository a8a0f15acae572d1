//! Preferences backend for stow.
//!
//! A preference store is a string-keyed map of [`Primitive`] values:
//! strings, booleans, integers, floats, data, dates, and arrays or
//! dictionaries of those. [`Preferences`] is the backend handle; typed
//! values cross into and out of the store through [`PreferencesStorable`].
//!
//! # Engines
//!
//! All engines implement the [`PreferenceStore`] trait:
//!
//! - [`MemoryPreferenceStore`] -- process-lifetime named suites
//! - [`FilePreferenceStore`] -- a JSON document rewritten atomically on
//!   every change
//!
//! # Example
//!
//! ```ignore
//! use stow_core::Storage;
//! use stow_defaults::{Preferences, PreferencesBinding};
//!
//! let sound = PreferencesBinding::for_key(&Preferences::standard(), "catSound", || "nyan".to_string(), true);
//! assert_eq!(sound.get(), "nyan");
//! ```

pub mod error;
pub mod file;
pub mod memory;
pub mod preferences;
pub mod primitive;
pub mod storable;
pub mod traits;

pub use error::{PrefsError, PrefsResult};
pub use file::FilePreferenceStore;
pub use memory::MemoryPreferenceStore;
pub use preferences::{Preferences, PreferencesBinding, PreferencesId, PreferencesRef, STANDARD_SUITE};
pub use primitive::Primitive;
pub use storable::PreferencesStorable;
pub use traits::PreferenceStore;

// Referenced by the exported macros.
pub use stow_core::{ConversionError, RawRepresentable};
