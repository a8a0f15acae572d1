//! Secret-store backend for stow.
//!
//! A [`Keychain`] addresses one set of secrets by a keychain-style identity
//! ([`ItemClass`]): generic passwords by service and access group, or
//! internet passwords by server, protocol, and authentication type. Each
//! secret is either text or bytes; typed values cross over through
//! [`KeychainStorable`].
//!
//! Unlike preferences, every secret-store operation is fallible. A failed
//! write or remove is returned to the caller and reported to the registry's
//! failure hook.

pub mod error;
pub mod keychain;
pub mod memory;
pub mod storable;
pub mod traits;

pub use error::{SecretError, SecretResult};
pub use keychain::{
    AuthenticationType, ItemClass, Keychain, KeychainBinding, KeychainRef, Protocol,
    DEFAULT_SERVICE,
};
pub use memory::MemorySecretStore;
pub use storable::{KeychainStorable, SecretKind, SecretValue};
pub use traits::SecretStore;

// Referenced by the exported macros.
pub use stow_core::{ConversionError, RawRepresentable};
