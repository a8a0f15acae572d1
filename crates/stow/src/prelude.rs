//! The names most applications need, in one import.
//!
//! ```ignore
//! use stow::prelude::*;
//! ```

pub use stow_cache::{Cache, CacheBinding, CacheConfig};
pub use stow_core::{
    AnyStorage, Backend, BackendExt, Binding, Compose, Migrate, Registry, Storage, StorageExt,
    StorageRef, StorageResult,
};
pub use stow_defaults::{Preferences, PreferencesBinding, Primitive};
pub use stow_keychain::{Keychain, KeychainBinding};

pub use crate::config::StowConfig;
