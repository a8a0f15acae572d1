//! The [`Keychain`] backend handle.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use bytes::Bytes;
use stow_core::{Backend, Binding, StorageError, StorageRef, StorageResult, UnderlyingStorage};

use crate::error::{SecretError, SecretResult};
use crate::memory::MemorySecretStore;
use crate::storable::{KeychainStorable, SecretKind, SecretValue};
use crate::traits::SecretStore;

/// Service name of the default keychain.
pub const DEFAULT_SERVICE: &str = "stow";

/// Transport of an internet password.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Http,
    Https,
    Ftp,
    Ssh,
    Other(String),
}

/// How an internet password is presented to its server.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AuthenticationType {
    Default,
    HttpBasic,
    HttpDigest,
    HtmlForm,
    Other(String),
}

/// The identity of a keychain: which items it addresses.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ItemClass {
    /// Application secrets grouped by service name.
    GenericPassword {
        service: String,
        access_group: Option<String>,
    },
    /// Credentials for one server.
    InternetPassword {
        server: String,
        protocol: Protocol,
        authentication: AuthenticationType,
    },
}

type Vaults = Mutex<HashMap<ItemClass, Arc<dyn SecretStore>>>;

fn vaults() -> &'static Vaults {
    static VAULTS: OnceLock<Vaults> = OnceLock::new();
    VAULTS.get_or_init(Default::default)
}

/// A handle to one secret store.
///
/// Two handles are equal when their [`ItemClass`]es are: generic passwords
/// by service and access group, internet passwords by server, protocol,
/// and authentication type. Handles built through the constructors share
/// one engine per identity.
#[derive(Clone)]
pub struct Keychain {
    class: ItemClass,
    store: Arc<dyn SecretStore>,
}

impl Keychain {
    /// Generic passwords for `service`.
    pub fn service(service: &str) -> Self {
        Self::for_class(ItemClass::GenericPassword {
            service: service.to_string(),
            access_group: None,
        })
    }

    /// Generic passwords for `service`, shared through `access_group`.
    pub fn shared_service(service: &str, access_group: &str) -> Self {
        Self::for_class(ItemClass::GenericPassword {
            service: service.to_string(),
            access_group: Some(access_group.to_string()),
        })
    }

    /// Internet passwords for `server`.
    pub fn server(server: &str, protocol: Protocol, authentication: AuthenticationType) -> Self {
        Self::for_class(ItemClass::InternetPassword {
            server: server.to_string(),
            protocol,
            authentication,
        })
    }

    /// The handle for `class`, backed by the process's in-memory vault for
    /// that identity.
    pub fn for_class(class: ItemClass) -> Self {
        let mut vaults = vaults().lock().unwrap_or_else(PoisonError::into_inner);
        let store = vaults
            .entry(class.clone())
            .or_insert_with(|| Arc::new(MemorySecretStore::new()))
            .clone();
        Self { class, store }
    }

    /// Wrap a custom engine under an explicit identity.
    pub fn with_store(class: ItemClass, store: Arc<dyn SecretStore>) -> Self {
        Self { class, store }
    }

    pub fn item_class(&self) -> &ItemClass {
        &self.class
    }

    pub fn get_string(&self, key: &str) -> SecretResult<Option<String>> {
        self.store.get_string(key)
    }

    pub fn get_bytes(&self, key: &str) -> SecretResult<Option<Bytes>> {
        self.store.get_bytes(key)
    }

    pub fn set_string(&self, key: &str, value: &str) -> SecretResult<()> {
        self.store.set_string(key, value)
    }

    pub fn set_bytes(&self, key: &str, value: &[u8]) -> SecretResult<()> {
        self.store.set_bytes(key, value)
    }

    pub fn remove(&self, key: &str) -> SecretResult<()> {
        self.store.remove(key)
    }

    pub fn remove_all(&self) -> SecretResult<()> {
        self.store.remove_all()
    }

    pub fn keys(&self) -> SecretResult<Vec<String>> {
        self.store.keys()
    }

    fn read(&self, key: &str, kind: SecretKind) -> SecretResult<Option<SecretValue>> {
        Ok(match kind {
            SecretKind::String => self.store.get_string(key)?.map(SecretValue::String),
            SecretKind::Data => self.store.get_bytes(key)?.map(SecretValue::Data),
        })
    }
}

impl PartialEq for Keychain {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class
    }
}

impl Eq for Keychain {}

impl fmt::Debug for Keychain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class {
            ItemClass::GenericPassword {
                service,
                access_group: None,
            } => write!(f, "Keychain({service})"),
            ItemClass::GenericPassword {
                service,
                access_group: Some(group),
            } => write!(f, "Keychain({service}, {group})"),
            ItemClass::InternetPassword {
                server,
                protocol,
                authentication,
            } => write!(f, "Keychain({protocol:?} {server}, {authentication:?})"),
        }
    }
}

impl UnderlyingStorage for Keychain {
    fn make_default() -> Self {
        Self::service(DEFAULT_SERVICE)
    }
}

impl<T: KeychainStorable> Backend<T> for Keychain {
    fn load(&self, key: &str) -> StorageResult<Option<T>> {
        let value = match self.read(key, T::stored_as()) {
            Ok(value) => value,
            Err(err @ SecretError::InvalidUtf8 { .. }) => {
                return Err(StorageError::decode::<T>(key, err))
            }
            Err(err) => return Err(StorageError::backend(key, err)),
        };
        value
            .map(T::from_keychain)
            .transpose()
            .map_err(|e| StorageError::decode::<T>(key, e))
    }

    fn store(&self, key: &str, value: &T) -> StorageResult<()> {
        let result = match value
            .to_keychain()
            .map_err(|e| StorageError::conversion::<T>(key, e))?
        {
            SecretValue::String(s) => self.store.set_string(key, &s),
            SecretValue::Data(data) => self.store.set_bytes(key, &data),
        };
        result.map_err(|e| StorageError::backend(key, e))
    }

    fn erase(&self, key: &str) -> StorageResult<()> {
        self.store
            .remove(key)
            .map_err(|e| StorageError::backend(key, e))
    }
}

/// The shared reference to a secret.
pub type KeychainRef<T> = StorageRef<Keychain, T>;

/// A secret with a default.
pub type KeychainBinding<T> = Binding<Keychain, T>;
