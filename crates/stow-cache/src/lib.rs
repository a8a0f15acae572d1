//! Object-cache backend for stow.
//!
//! [`ObjectCache`] keeps bincode-encoded values in a bounded memory tier
//! and, optionally, in a directory of checksummed files. [`Cache`] is the
//! backend handle; it may be unavailable, in which case it reads as empty
//! and ignores writes.
//!
//! Any `serde` type can be cached; there is no per-type opt-in.

pub mod cache;
pub mod config;
pub mod error;
pub mod frame;
pub mod object;

pub use cache::{Cache, CacheBinding, CacheRef};
pub use config::{CacheConfig, DEFAULT_CACHE_NAME, DEFAULT_MEMORY_CAPACITY};
pub use error::{CacheError, CacheResult};
pub use object::ObjectCache;
