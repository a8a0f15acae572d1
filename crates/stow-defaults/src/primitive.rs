//! The closed set of values a preference store can hold.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A value stored natively by a preference store.
///
/// Anything else must be converted into one of these first; see
/// [`PreferencesStorable`](crate::PreferencesStorable).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    String(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
    Data(Bytes),
    Date(DateTime<Utc>),
    Array(Vec<Primitive>),
    Dictionary(BTreeMap<String, Primitive>),
}

impl Primitive {
    /// Lowercase name of the variant, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Data(_) => "data",
            Self::Date(_) => "date",
            Self::Array(_) => "array",
            Self::Dictionary(_) => "dictionary",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether every float in this value, at any depth, is finite.
    ///
    /// JSON has no encoding for NaN or infinity.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(x) => x.is_finite(),
            Self::Array(items) => items.iter().all(Primitive::is_finite),
            Self::Dictionary(entries) => entries.values().all(Primitive::is_finite),
            _ => true,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Data(data) => write!(f, "<{} bytes>", data.len()),
            Self::Date(date) => write!(f, "{}", date.to_rfc3339()),
            Self::Array(items) => write!(f, "<array of {}>", items.len()),
            Self::Dictionary(entries) => write!(f, "<dictionary of {}>", entries.len()),
        }
    }
}

impl From<&str> for Primitive {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Primitive {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Primitive {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Primitive {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for Primitive {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<Bytes> for Primitive {
    fn from(data: Bytes) -> Self {
        Self::Data(data)
    }
}

impl From<DateTime<Utc>> for Primitive {
    fn from(date: DateTime<Utc>) -> Self {
        Self::Date(date)
    }
}
