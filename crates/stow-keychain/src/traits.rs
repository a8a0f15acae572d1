//! The [`SecretStore`] trait defining the raw secret engine.

use bytes::Bytes;

use crate::error::SecretResult;

/// A string-keyed store of secrets, readable as strings or raw bytes.
///
/// Every operation can fail; failures are surfaced, never swallowed.
pub trait SecretStore: Send + Sync {
    /// Read the secret at `key` as UTF-8 text.
    fn get_string(&self, key: &str) -> SecretResult<Option<String>>;

    /// Read the secret at `key` as bytes.
    fn get_bytes(&self, key: &str) -> SecretResult<Option<Bytes>>;

    /// Store a text secret at `key`.
    fn set_string(&self, key: &str, value: &str) -> SecretResult<()>;

    /// Store a binary secret at `key`.
    fn set_bytes(&self, key: &str, value: &[u8]) -> SecretResult<()>;

    /// Remove the secret at `key`. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> SecretResult<()>;

    /// Remove every secret.
    fn remove_all(&self) -> SecretResult<()>;

    /// All keys, sorted.
    fn keys(&self) -> SecretResult<Vec<String>>;
}
