//! Process-level configuration.
//!
//! ```toml
//! preferences_file = "/var/lib/app/prefs.json"
//!
//! [registry]
//! cleanup_threshold = 32
//! trace = false
//!
//! [cache]
//! name = "app"
//! directory = "/var/cache/app"
//! memory_capacity = 512
//! disk = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stow_cache::{Cache, CacheConfig};
use stow_core::{Hooks, Registry, RegistryConfig};
use stow_defaults::Preferences;
use tracing::info;

use crate::error::{ConfigError, ConfigResult};

/// Everything [`StowConfig::install`] sets up: the global registry, the
/// shared preferences, and the shared object cache.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StowConfig {
    pub registry: RegistryConfig,
    pub cache: CacheConfig,
    /// Back the shared preferences with this JSON file instead of the
    /// in-memory standard suite.
    pub preferences_file: Option<PathBuf>,
}

impl StowConfig {
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Install with the default failure hooks.
    pub fn install(&self) -> ConfigResult<&'static Registry> {
        self.install_with_hooks(Hooks::default())
    }

    /// Open the configured stores, install the global registry, then point
    /// the shared preferences and shared cache at the opened stores.
    ///
    /// Must run before anything touches [`Registry::global`]. Nothing global
    /// changes if the preferences file cannot be opened. A cache that fails
    /// to open leaves the shared cache unavailable rather than failing the
    /// install.
    pub fn install_with_hooks(&self, hooks: Hooks) -> ConfigResult<&'static Registry> {
        let preferences = self
            .preferences_file
            .as_ref()
            .map(Preferences::open_file)
            .transpose()?;
        let cache = Cache::open(self.cache.clone());

        let registry = Registry::install_global(Registry::with_hooks(self.registry.clone(), hooks))
            .map_err(|_| ConfigError::AlreadyInstalled)?;
        if let Some(preferences) = preferences {
            Preferences::set_shared(preferences);
        }
        Cache::set_shared(cache);

        info!(
            cleanup_threshold = self.registry.cleanup_threshold,
            trace = self.registry.trace,
            cache = %self.cache.name,
            "stow installed"
        );
        Ok(registry)
    }
}
