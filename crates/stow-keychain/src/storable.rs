//! Conversions between Rust values and secrets.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use stow_core::ConversionError;

/// The two shapes a secret can take.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SecretValue {
    String(String),
    Data(Bytes),
}

/// Which shape a type is stored as, and therefore read back as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecretKind {
    String,
    Data,
}

/// A value that can be stored in a secret store.
pub trait KeychainStorable: Sized {
    /// The shape this type is stored as.
    fn stored_as() -> SecretKind;

    /// Convert into the stored form.
    fn to_keychain(&self) -> Result<SecretValue, ConversionError>;

    /// Convert back from the stored form.
    fn from_keychain(value: SecretValue) -> Result<Self, ConversionError>;
}

impl KeychainStorable for String {
    fn stored_as() -> SecretKind {
        SecretKind::String
    }

    fn to_keychain(&self) -> Result<SecretValue, ConversionError> {
        Ok(SecretValue::String(self.clone()))
    }

    fn from_keychain(value: SecretValue) -> Result<Self, ConversionError> {
        match value {
            SecretValue::String(s) => Ok(s),
            SecretValue::Data(_) => Err(ConversionError::mismatch("string", "data")),
        }
    }
}

impl KeychainStorable for Bytes {
    fn stored_as() -> SecretKind {
        SecretKind::Data
    }

    fn to_keychain(&self) -> Result<SecretValue, ConversionError> {
        Ok(SecretValue::Data(self.clone()))
    }

    fn from_keychain(value: SecretValue) -> Result<Self, ConversionError> {
        match value {
            SecretValue::Data(data) => Ok(data),
            SecretValue::String(s) => Ok(Bytes::from(s)),
        }
    }
}

impl KeychainStorable for bool {
    fn stored_as() -> SecretKind {
        SecretKind::String
    }

    fn to_keychain(&self) -> Result<SecretValue, ConversionError> {
        Ok(SecretValue::String(self.to_string()))
    }

    fn from_keychain(value: SecretValue) -> Result<Self, ConversionError> {
        // Never echo the stored text: it is a secret.
        match String::from_keychain(value)?.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ConversionError::mismatch("bool", "string")),
        }
    }
}

/// Store `value` as its JSON encoding.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<SecretValue, ConversionError> {
    serde_json::to_vec(value)
        .map(|json| SecretValue::Data(Bytes::from(json)))
        .map_err(|e| ConversionError::Encoding(e.to_string()))
}

/// Decode a value stored by [`encode_json`].
pub fn decode_json<T: DeserializeOwned>(value: SecretValue) -> Result<T, ConversionError> {
    let json = Bytes::from_keychain(value)?;
    serde_json::from_slice(&json).map_err(|e| ConversionError::Encoding(e.to_string()))
}

/// Make `serde` types storable as JSON-encoded secrets.
#[macro_export]
macro_rules! impl_keychain_codable {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::KeychainStorable for $ty {
            fn stored_as() -> $crate::SecretKind {
                $crate::SecretKind::Data
            }

            fn to_keychain(&self) -> ::std::result::Result<$crate::SecretValue, $crate::ConversionError> {
                $crate::storable::encode_json(self)
            }

            fn from_keychain(value: $crate::SecretValue) -> ::std::result::Result<Self, $crate::ConversionError> {
                $crate::storable::decode_json(value)
            }
        }
    )+};
}

/// Make [`RawRepresentable`](stow_core::RawRepresentable) types storable as
/// secrets through their raw value.
#[macro_export]
macro_rules! impl_keychain_raw {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::KeychainStorable for $ty {
            fn stored_as() -> $crate::SecretKind {
                <<$ty as $crate::RawRepresentable>::Raw as $crate::KeychainStorable>::stored_as()
            }

            fn to_keychain(&self) -> ::std::result::Result<$crate::SecretValue, $crate::ConversionError> {
                $crate::KeychainStorable::to_keychain(
                    &<$ty as $crate::RawRepresentable>::raw_value(self),
                )
            }

            fn from_keychain(value: $crate::SecretValue) -> ::std::result::Result<Self, $crate::ConversionError> {
                let raw = <<$ty as $crate::RawRepresentable>::Raw as $crate::KeychainStorable>::from_keychain(value)?;
                <$ty as $crate::RawRepresentable>::from_raw_value(raw).ok_or_else(|| {
                    $crate::ConversionError::OutOfRange(
                        ::std::format!("stored raw value names no {}", ::std::stringify!($ty)),
                    )
                })
            }
        }
    )+};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use stow_core::RawRepresentable;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Credentials {
        user: String,
        token: String,
    }

    crate::impl_keychain_codable!(Credentials);

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Tier {
        Free,
        Pro,
    }

    impl RawRepresentable for Tier {
        type Raw = String;

        fn raw_value(&self) -> String {
            match self {
                Tier::Free => "free".into(),
                Tier::Pro => "pro".into(),
            }
        }

        fn from_raw_value(raw: String) -> Option<Self> {
            match raw.as_str() {
                "free" => Some(Tier::Free),
                "pro" => Some(Tier::Pro),
                _ => None,
            }
        }
    }

    crate::impl_keychain_raw!(Tier);

    #[test]
    fn bool_is_stored_as_text() {
        assert_eq!(
            true.to_keychain().unwrap(),
            SecretValue::String("true".into())
        );
        assert!(!bool::from_keychain(SecretValue::String("false".into())).unwrap());
        assert!(bool::from_keychain(SecretValue::String("yes".into())).is_err());
    }

    #[test]
    fn bool_decode_error_does_not_echo_the_secret() {
        let err = bool::from_keychain(SecretValue::String("hunter2".into())).unwrap_err();
        assert_eq!(err, ConversionError::mismatch("bool", "string"));
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn codable_round_trips_as_data() {
        let creds = Credentials {
            user: "ada".into(),
            token: "t".into(),
        };
        assert_eq!(Credentials::stored_as(), SecretKind::Data);
        let value = creds.to_keychain().unwrap();
        assert!(matches!(value, SecretValue::Data(_)));
        assert_eq!(Credentials::from_keychain(value).unwrap(), creds);
    }

    #[test]
    fn raw_follows_raw_type_shape() {
        assert_eq!(Tier::stored_as(), SecretKind::String);
        assert_eq!(Tier::Pro.to_keychain().unwrap(), SecretValue::String("pro".into()));
        assert!(Tier::from_keychain(SecretValue::String("enterprise".into())).is_err());
    }

    #[test]
    fn string_from_data_is_a_mismatch() {
        let err = String::from_keychain(SecretValue::Data(Bytes::new())).unwrap_err();
        assert!(matches!(err, ConversionError::TypeMismatch { .. }));
    }
}
