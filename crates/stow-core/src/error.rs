use thiserror::Error;

/// A typed value could not be turned into a backend primitive (or back).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
    /// Structured encoding or decoding failed.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// The value does not fit the backend's primitive range.
    #[error("value out of range: {0}")]
    OutOfRange(String),

    /// The stored primitive has a different shape than the requested type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    /// The value has no representation in this backend at all.
    #[error("unsupported value: {0}")]
    Unsupported(String),
}

impl ConversionError {
    /// Shorthand for a [`ConversionError::TypeMismatch`].
    pub fn mismatch(expected: &'static str, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected,
            found: found.into(),
        }
    }
}

/// Errors from storage references and backend adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// A value could not be converted into the backend's primitive shape.
    #[error("cannot store {type_name} at '{key}': {source}")]
    Conversion {
        key: String,
        type_name: String,
        #[source]
        source: ConversionError,
    },

    /// A stored value exists but does not decode as the requested type.
    #[error("cannot decode '{key}' as {type_name}: {reason}")]
    Decode {
        key: String,
        type_name: String,
        reason: String,
    },

    /// The backend rejected a write or remove.
    #[error("backend rejected '{key}': {reason}")]
    Backend { key: String, reason: String },

    /// The same key was looked up against two unequal backend handles.
    #[error("'{key}' ({type_name}) is bound to {existing}, not {requested}")]
    IdentityViolation {
        key: String,
        type_name: String,
        existing: String,
        requested: String,
    },
}

impl StorageError {
    /// Build a [`StorageError::Conversion`] for values of type `T`.
    pub fn conversion<T: ?Sized>(key: &str, source: ConversionError) -> Self {
        Self::Conversion {
            key: key.to_string(),
            type_name: std::any::type_name::<T>().to_string(),
            source,
        }
    }

    /// Build a [`StorageError::Decode`] for values of type `T`.
    pub fn decode<T: ?Sized>(key: &str, reason: impl ToString) -> Self {
        Self::Decode {
            key: key.to_string(),
            type_name: std::any::type_name::<T>().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`StorageError::Backend`].
    pub fn backend(key: &str, reason: impl ToString) -> Self {
        Self::Backend {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The key the failed operation addressed.
    pub fn key(&self) -> &str {
        match self {
            Self::Conversion { key, .. }
            | Self::Decode { key, .. }
            | Self::Backend { key, .. }
            | Self::IdentityViolation { key, .. } => key,
        }
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
