//! Typed, single-instance persistence references.
//!
//! Address a persisted value by key and get back a shared, typed cell that
//! reads through once and writes through on every change. All holders of the
//! same key in the same store share one cell.
//!
//! ```ignore
//! use stow::prelude::*;
//!
//! StowConfig::from_file("stow.toml")?.install()?;
//!
//! let sound = PreferencesBinding::for_key(&Preferences::standard(), "catSound", || "nyan".to_string(), true);
//! assert_eq!(sound.get(), "nyan");
//! sound.set("meow".to_string())?;
//!
//! let token = KeychainBinding::with_default_backend("apiToken", String::new, false);
//! let legacy = PreferencesBinding::with_default_backend("launchCount", || 0_i64, false);
//! let launches = PreferencesBinding::with_default_backend("launches", || "0".to_string(), false)
//!     .migrate_from(legacy, |n| n.to_string());
//! ```
//!
//! This crate re-exports the core and every backend:
//!
//! - [`stow_core`] -- registry, references, bindings, combinators
//! - [`stow_defaults`] -- preferences
//! - [`stow_keychain`] -- secrets
//! - [`stow_cache`] -- object cache

pub mod config;
pub mod error;
pub mod prelude;

pub use config::StowConfig;
pub use error::{ConfigError, ConfigResult};

pub use {stow_cache, stow_core, stow_defaults, stow_keychain};

// Re-export key types
pub use stow_cache::Cache;
pub use stow_core::{
    Backend, BackendExt, Binding, Compose, Hooks, Migrate, Registry, RegistryConfig, Storage,
    StorageError, StorageExt, StorageRef, StorageResult,
};
pub use stow_defaults::Preferences;
pub use stow_keychain::Keychain;

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;

    use stow_core::TraceEvent;
    use stow_defaults::Primitive;
    use stow_keychain::ItemClass;

    use super::*;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    }

    fn registry() -> Registry {
        init_tracing();
        Registry::with_hooks(RegistryConfig::traced(), Hooks::log_only())
    }

    // -----------------------------------------------------------------------
    // References
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_lookups_share_one_reference() {
        let registry = Arc::new(registry());
        let prefs = Preferences::suite("e2e-dedup");
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let prefs = prefs.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.get::<_, String>(&prefs, "shared")
                })
            })
            .collect();
        let refs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for r in &refs[1..] {
            assert!(Arc::ptr_eq(&refs[0], r));
        }
        refs[3].set_content(Some("seen".into())).unwrap();
        assert_eq!(refs[5].content().as_deref(), Some("seen"));
    }

    #[test]
    fn miss_reads_absent_then_writes_through() {
        let registry = registry();
        let prefs = Preferences::suite("e2e-read-through");
        let reference = registry.get::<_, String>(&prefs, "name");
        assert_eq!(reference.content(), None);

        reference.set_content(Some("Ada".into())).unwrap();
        assert_eq!(prefs.get_raw("name").unwrap(), Some(Primitive::from("Ada")));
    }

    #[test]
    fn remove_clears_backend_and_fresh_lookup_is_absent() {
        let registry = registry();
        let prefs = Preferences::suite("e2e-remove");
        let reference = registry.get::<_, i64>(&prefs, "count");
        reference.set_content(Some(3)).unwrap();
        reference.set_content(None).unwrap();
        assert_eq!(prefs.get_raw("count").unwrap(), None);
        drop(reference);

        assert_eq!(registry.get::<_, i64>(&prefs, "count").content(), None);
    }

    #[test]
    fn same_key_in_different_backend_kinds_is_independent() {
        let registry = registry();
        let prefs = Preferences::suite("e2e-kinds");
        let keychain = Keychain::for_class(ItemClass::GenericPassword {
            service: "e2e-kinds".into(),
            access_group: None,
        });
        let pref = registry.get::<_, String>(&prefs, "token");
        let secret = registry.get::<_, String>(&keychain, "token");
        pref.set_content(Some("public".into())).unwrap();
        secret.set_content(Some("private".into())).unwrap();
        assert_eq!(pref.content().as_deref(), Some("public"));
        assert_eq!(keychain.get_string("token").unwrap().as_deref(), Some("private"));
    }

    // -----------------------------------------------------------------------
    // Bindings and combinators
    // -----------------------------------------------------------------------

    #[test]
    fn default_persists_only_when_asked() {
        let registry = registry();
        let prefs = Preferences::suite("e2e-defaults");

        let quiet = registry.bind(&prefs, "quiet", || 5_i64, false);
        assert_eq!(quiet.get(), 5);
        assert_eq!(prefs.get_raw("quiet").unwrap(), None);

        let loud = registry.bind(&prefs, "loud", || 5_i64, true);
        assert_eq!(loud.get(), 5);
        assert_eq!(prefs.get_raw("loud").unwrap(), Some(Primitive::Integer(5)));
    }

    #[test]
    fn composition_falls_back_and_writes_both() {
        let registry = registry();
        let prefs = Preferences::suite("e2e-compose");
        let keychain = Keychain::service("e2e-compose");
        keychain.set_string("token", "from keychain").unwrap();

        let primary = registry.bind(&prefs, "token", String::new, false);
        let fallback = registry.bind(&keychain, "token", String::new, false);
        let token = primary.clone() + fallback.clone();
        assert_eq!(token.get(), "from keychain");

        token.set("rotated".into()).unwrap();
        assert_eq!(primary.get(), "rotated");
        assert_eq!(fallback.get(), "rotated");
        assert_eq!(prefs.get_raw("token").unwrap(), Some(Primitive::from("rotated")));
        assert_eq!(keychain.get_string("token").unwrap().as_deref(), Some("rotated"));
    }

    #[test]
    fn migration_inherits_legacy_value_once() {
        let registry = registry();
        let prefs = Preferences::suite("e2e-migrate");
        prefs.set_raw("legacyCount", Primitive::Integer(1551)).unwrap();

        let legacy = registry.bind(&prefs, "legacyCount", || 0_i64, false);
        let current = registry.bind(&prefs, "count", || "New".to_string(), false);
        let count = current.migrate_from(legacy, |n: i64| n.to_string());
        assert_eq!(count.get(), "1551");

        count.set("Brand New".into()).unwrap();
        assert_eq!(count.get(), "Brand New");
        assert_eq!(prefs.get_raw("count").unwrap(), Some(Primitive::from("Brand New")));
        assert_eq!(prefs.get_raw("legacyCount").unwrap(), Some(Primitive::Integer(1551)));
    }

    #[test]
    fn erased_chains_mix_backends() {
        let registry = registry();
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(stow_cache::CacheConfig::named("e2e-any").with_directory(dir.path()));
        let prefs = Preferences::suite("e2e-any");

        let chain = registry
            .bind(&cache, "score", || 0_u32, false)
            .or(registry.bind(&prefs, "score", || 0_u32, false))
            .boxed();
        prefs.set_raw("score", Primitive::Integer(12)).unwrap();
        registry.get::<_, u32>(&prefs, "score").refresh();
        assert_eq!(chain.get(), 12);

        chain.set(13).unwrap();
        assert_eq!(Backend::<u32>::load(&cache, "score").unwrap(), Some(13));
    }

    // -----------------------------------------------------------------------
    // The cat
    // -----------------------------------------------------------------------

    #[test]
    fn cat_sound_is_shared_and_persisted() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        init_tracing();
        let registry = Registry::with_hooks(RegistryConfig::traced(), Hooks::log_only())
            .trace_to(Arc::new(move |event: &TraceEvent| {
                sink.lock().unwrap().push(event.to_string())
            }));
        let prefs = Preferences::suite("e2e-cat");

        let sound = registry.bind(&prefs, "catSound", || "nyan".to_string(), true);
        assert_eq!(sound.get(), "nyan");
        assert_eq!(prefs.get_raw("catSound").unwrap(), Some(Primitive::from("nyan")));

        sound.set("meow".into()).unwrap();
        assert_eq!(prefs.get_raw("catSound").unwrap(), Some(Primitive::from("meow")));

        let again = registry.bind(&prefs, "catSound", || "nyan".to_string(), false);
        assert_eq!(again.get(), "meow");

        let lines = lines.lock().unwrap();
        assert_eq!(
            lines[..3],
            [
                "ALLOC StorageRef<Preferences, String>".to_string(),
                "CREAT StorageRef<Preferences, String> catSound IN Preferences(e2e-cat)".to_string(),
                "FETCH StorageRef<Preferences, String> catSound FROM Preferences(e2e-cat)"
                    .to_string(),
            ]
        );
    }
}
