//! Conversions between Rust values and preference [`Primitive`]s.
//!
//! Three families:
//!
//! - native values (strings, numbers, booleans, data, dates, and arrays or
//!   string-keyed maps of storable values) map directly onto a primitive;
//! - `serde` types opt in with [`impl_preferences_codable!`], which stores
//!   their JSON encoding as [`Primitive::Data`];
//! - [`RawRepresentable`](stow_core::RawRepresentable) types opt in with
//!   [`impl_preferences_raw!`], which stores their raw value.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use stow_core::ConversionError;

use crate::primitive::Primitive;

/// A value that can be stored in a preference store.
pub trait PreferencesStorable: Sized {
    /// Convert into the stored form.
    fn to_preferences(&self) -> Result<Primitive, ConversionError>;

    /// Convert back from the stored form.
    fn from_preferences(raw: Primitive) -> Result<Self, ConversionError>;
}

/// Store `value` as its JSON encoding.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Primitive, ConversionError> {
    serde_json::to_vec(value)
        .map(|json| Primitive::Data(Bytes::from(json)))
        .map_err(|e| ConversionError::Encoding(e.to_string()))
}

/// Decode a value stored by [`encode_json`].
pub fn decode_json<T: DeserializeOwned>(raw: Primitive) -> Result<T, ConversionError> {
    match raw {
        Primitive::Data(json) => {
            serde_json::from_slice(&json).map_err(|e| ConversionError::Encoding(e.to_string()))
        }
        other => Err(ConversionError::mismatch("data", other.kind())),
    }
}

impl PreferencesStorable for Primitive {
    fn to_preferences(&self) -> Result<Primitive, ConversionError> {
        Ok(self.clone())
    }

    fn from_preferences(raw: Primitive) -> Result<Self, ConversionError> {
        Ok(raw)
    }
}

impl PreferencesStorable for String {
    fn to_preferences(&self) -> Result<Primitive, ConversionError> {
        Ok(Primitive::String(self.clone()))
    }

    fn from_preferences(raw: Primitive) -> Result<Self, ConversionError> {
        match raw {
            Primitive::String(s) => Ok(s),
            other => Err(ConversionError::mismatch("string", other.kind())),
        }
    }
}

impl PreferencesStorable for bool {
    fn to_preferences(&self) -> Result<Primitive, ConversionError> {
        Ok(Primitive::Bool(*self))
    }

    fn from_preferences(raw: Primitive) -> Result<Self, ConversionError> {
        match raw {
            Primitive::Bool(b) => Ok(b),
            other => Err(ConversionError::mismatch("bool", other.kind())),
        }
    }
}

macro_rules! integer_storable {
    ($($ty:ty),+ $(,)?) => {$(
        impl PreferencesStorable for $ty {
            fn to_preferences(&self) -> Result<Primitive, ConversionError> {
                i64::try_from(*self)
                    .map(Primitive::Integer)
                    .map_err(|_| ConversionError::OutOfRange(format!("{} {} exceeds i64", stringify!($ty), self)))
            }

            fn from_preferences(raw: Primitive) -> Result<Self, ConversionError> {
                match raw {
                    Primitive::Integer(n) => <$ty>::try_from(n)
                        .map_err(|_| ConversionError::OutOfRange(format!("{n} does not fit {}", stringify!($ty)))),
                    other => Err(ConversionError::mismatch("integer", other.kind())),
                }
            }
        }
    )+};
}

integer_storable!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Largest magnitude below which every integer is exactly an `f64`.
const MAX_EXACT_F64_INTEGER: i64 = 1 << 53;

fn finite(x: f64) -> Result<Primitive, ConversionError> {
    if !x.is_finite() {
        return Err(ConversionError::Unsupported(format!("non-finite float {x}")));
    }
    Ok(Primitive::Float(x))
}

impl PreferencesStorable for f64 {
    fn to_preferences(&self) -> Result<Primitive, ConversionError> {
        finite(*self)
    }

    fn from_preferences(raw: Primitive) -> Result<Self, ConversionError> {
        match raw {
            Primitive::Float(x) => Ok(x),
            Primitive::Integer(n) if n.unsigned_abs() <= MAX_EXACT_F64_INTEGER as u64 => Ok(n as f64),
            Primitive::Integer(n) => Err(ConversionError::OutOfRange(format!(
                "{n} is not exactly representable as f64"
            ))),
            other => Err(ConversionError::mismatch("float", other.kind())),
        }
    }
}

impl PreferencesStorable for f32 {
    fn to_preferences(&self) -> Result<Primitive, ConversionError> {
        finite(f64::from(*self))
    }

    fn from_preferences(raw: Primitive) -> Result<Self, ConversionError> {
        let x = f64::from_preferences(raw)?;
        let narrowed = x as f32;
        if x.is_finite() && !narrowed.is_finite() {
            return Err(ConversionError::OutOfRange(format!("{x} does not fit f32")));
        }
        Ok(narrowed)
    }
}

impl PreferencesStorable for Bytes {
    fn to_preferences(&self) -> Result<Primitive, ConversionError> {
        Ok(Primitive::Data(self.clone()))
    }

    fn from_preferences(raw: Primitive) -> Result<Self, ConversionError> {
        match raw {
            Primitive::Data(data) => Ok(data),
            other => Err(ConversionError::mismatch("data", other.kind())),
        }
    }
}

impl PreferencesStorable for DateTime<Utc> {
    fn to_preferences(&self) -> Result<Primitive, ConversionError> {
        Ok(Primitive::Date(*self))
    }

    fn from_preferences(raw: Primitive) -> Result<Self, ConversionError> {
        match raw {
            Primitive::Date(date) => Ok(date),
            other => Err(ConversionError::mismatch("date", other.kind())),
        }
    }
}

/// Stored as a string, like a file URL.
impl PreferencesStorable for PathBuf {
    fn to_preferences(&self) -> Result<Primitive, ConversionError> {
        self.to_str()
            .map(|s| Primitive::String(s.to_string()))
            .ok_or_else(|| ConversionError::Unsupported(format!("non-UTF-8 path {}", self.display())))
    }

    fn from_preferences(raw: Primitive) -> Result<Self, ConversionError> {
        String::from_preferences(raw).map(PathBuf::from)
    }
}

impl<T: PreferencesStorable> PreferencesStorable for Vec<T> {
    fn to_preferences(&self) -> Result<Primitive, ConversionError> {
        self.iter()
            .map(T::to_preferences)
            .collect::<Result<_, _>>()
            .map(Primitive::Array)
    }

    fn from_preferences(raw: Primitive) -> Result<Self, ConversionError> {
        match raw {
            Primitive::Array(items) => items.into_iter().map(T::from_preferences).collect(),
            other => Err(ConversionError::mismatch("array", other.kind())),
        }
    }
}

impl<T: PreferencesStorable> PreferencesStorable for BTreeMap<String, T> {
    fn to_preferences(&self) -> Result<Primitive, ConversionError> {
        self.iter()
            .map(|(k, v)| v.to_preferences().map(|raw| (k.clone(), raw)))
            .collect::<Result<_, _>>()
            .map(Primitive::Dictionary)
    }

    fn from_preferences(raw: Primitive) -> Result<Self, ConversionError> {
        match raw {
            Primitive::Dictionary(entries) => entries
                .into_iter()
                .map(|(k, v)| T::from_preferences(v).map(|value| (k, value)))
                .collect(),
            other => Err(ConversionError::mismatch("dictionary", other.kind())),
        }
    }
}

impl<T: PreferencesStorable> PreferencesStorable for HashMap<String, T> {
    fn to_preferences(&self) -> Result<Primitive, ConversionError> {
        self.iter()
            .map(|(k, v)| v.to_preferences().map(|raw| (k.clone(), raw)))
            .collect::<Result<_, _>>()
            .map(Primitive::Dictionary)
    }

    fn from_preferences(raw: Primitive) -> Result<Self, ConversionError> {
        BTreeMap::<String, T>::from_preferences(raw).map(|entries| entries.into_iter().collect())
    }
}

/// Make `serde` types storable in preferences as JSON-encoded data.
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Window { width: u32, height: u32 }
/// impl_preferences_codable!(Window);
/// ```
#[macro_export]
macro_rules! impl_preferences_codable {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::PreferencesStorable for $ty {
            fn to_preferences(&self) -> ::std::result::Result<$crate::Primitive, $crate::ConversionError> {
                $crate::storable::encode_json(self)
            }

            fn from_preferences(raw: $crate::Primitive) -> ::std::result::Result<Self, $crate::ConversionError> {
                $crate::storable::decode_json(raw)
            }
        }
    )+};
}

/// Make [`RawRepresentable`](stow_core::RawRepresentable) types storable in
/// preferences through their raw value.
///
/// A stored raw value that names no case fails to decode.
#[macro_export]
macro_rules! impl_preferences_raw {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::PreferencesStorable for $ty {
            fn to_preferences(&self) -> ::std::result::Result<$crate::Primitive, $crate::ConversionError> {
                $crate::PreferencesStorable::to_preferences(
                    &<$ty as $crate::RawRepresentable>::raw_value(self),
                )
            }

            fn from_preferences(raw: $crate::Primitive) -> ::std::result::Result<Self, $crate::ConversionError> {
                let raw = <<$ty as $crate::RawRepresentable>::Raw as $crate::PreferencesStorable>::from_preferences(raw)?;
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
    use proptest::prelude::*;
    use serde::Deserialize;
    use stow_core::RawRepresentable;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Window {
        width: u32,
        height: u32,
    }

    crate::impl_preferences_codable!(Window);

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Theme {
        Light,
        Dark,
    }

    impl RawRepresentable for Theme {
        type Raw = String;

        fn raw_value(&self) -> String {
            match self {
                Theme::Light => "light".into(),
                Theme::Dark => "dark".into(),
            }
        }

        fn from_raw_value(raw: String) -> Option<Self> {
            match raw.as_str() {
                "light" => Some(Theme::Light),
                "dark" => Some(Theme::Dark),
                _ => None,
            }
        }
    }

    crate::impl_preferences_raw!(Theme);

    // -----------------------------------------------------------------------
    // Native values
    // -----------------------------------------------------------------------

    #[test]
    fn u64_above_i64_max_is_rejected() {
        let err = u64::MAX.to_preferences().unwrap_err();
        assert!(matches!(err, ConversionError::OutOfRange(_)));
        assert_eq!(
            (i64::MAX as u64).to_preferences().unwrap(),
            Primitive::Integer(i64::MAX)
        );
    }

    #[test]
    fn narrowing_decode_is_checked() {
        let err = u8::from_preferences(Primitive::Integer(300)).unwrap_err();
        assert!(matches!(err, ConversionError::OutOfRange(_)));
        let err = u32::from_preferences(Primitive::Integer(-1)).unwrap_err();
        assert!(matches!(err, ConversionError::OutOfRange(_)));
    }

    #[test]
    fn wrong_shape_is_a_mismatch() {
        let err = String::from_preferences(Primitive::Integer(1551)).unwrap_err();
        assert_eq!(err, ConversionError::mismatch("string", "integer"));
    }

    #[test]
    fn floats_accept_integers() {
        assert_eq!(f64::from_preferences(Primitive::Integer(2)).unwrap(), 2.0);
        assert_eq!(f32::from_preferences(Primitive::Float(0.5)).unwrap(), 0.5);
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        for x in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = x.to_preferences().unwrap_err();
            assert!(matches!(err, ConversionError::Unsupported(_)));
        }
        assert!(matches!(
            f32::NAN.to_preferences().unwrap_err(),
            ConversionError::Unsupported(_)
        ));
        let err = vec![1.0, f64::NAN].to_preferences().unwrap_err();
        assert!(matches!(err, ConversionError::Unsupported(_)));
    }

    #[test]
    fn float_narrowing_is_checked() {
        let err = f32::from_preferences(Primitive::Float(1e300)).unwrap_err();
        assert!(matches!(err, ConversionError::OutOfRange(_)));

        let exact = 1_i64 << 53;
        assert_eq!(f64::from_preferences(Primitive::Integer(exact)).unwrap(), exact as f64);
        let err = f64::from_preferences(Primitive::Integer(exact + 1)).unwrap_err();
        assert!(matches!(err, ConversionError::OutOfRange(_)));
        let err = f64::from_preferences(Primitive::Integer(i64::MIN)).unwrap_err();
        assert!(matches!(err, ConversionError::OutOfRange(_)));
    }

    #[test]
    fn nested_collections() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), vec![1_i32, 2]);
        let raw = map.to_preferences().unwrap();
        let Primitive::Dictionary(entries) = &raw else {
            panic!("expected dictionary, got {raw:?}");
        };
        assert_eq!(
            entries["a"],
            Primitive::Array(vec![Primitive::Integer(1), Primitive::Integer(2)])
        );
        assert_eq!(HashMap::<String, Vec<i32>>::from_preferences(raw).unwrap(), map);
    }

    #[test]
    fn array_with_one_bad_element_fails_whole() {
        let raw = Primitive::Array(vec![Primitive::from("ok"), Primitive::Bool(false)]);
        assert!(Vec::<String>::from_preferences(raw).is_err());
    }

    #[test]
    fn paths_are_strings() {
        let path = PathBuf::from("/tmp/stow");
        assert_eq!(path.to_preferences().unwrap(), Primitive::from("/tmp/stow"));
    }

    // -----------------------------------------------------------------------
    // Codable and raw values
    // -----------------------------------------------------------------------

    #[test]
    fn codable_is_json_data() {
        let window = Window {
            width: 800,
            height: 600,
        };
        let raw = window.to_preferences().unwrap();
        let Primitive::Data(json) = &raw else {
            panic!("expected data, got {raw:?}");
        };
        assert_eq!(&json[..], br#"{"width":800,"height":600}"#);
        assert_eq!(Window::from_preferences(raw).unwrap(), window);
    }

    #[test]
    fn codable_rejects_non_data() {
        let err = Window::from_preferences(Primitive::from("x")).unwrap_err();
        assert_eq!(err, ConversionError::mismatch("data", "string"));
    }

    #[test]
    fn raw_values_round_through_raw_type() {
        assert_eq!(Theme::Dark.to_preferences().unwrap(), Primitive::from("dark"));
        assert_eq!(
            Theme::from_preferences(Primitive::from("light")).unwrap(),
            Theme::Light
        );
        assert!(Theme::from_preferences(Primitive::from("sepia")).is_err());
    }

    proptest! {
        #[test]
        fn integers_preserve_value(n in any::<i32>()) {
            let raw = n.to_preferences().unwrap();
            prop_assert_eq!(raw.as_i64(), Some(i64::from(n)));
            prop_assert_eq!(i32::from_preferences(raw).unwrap(), n);
        }

        #[test]
        fn strings_preserve_value(s in ".*") {
            let raw = s.to_preferences().unwrap();
            prop_assert_eq!(raw.as_str(), Some(s.as_str()));
        }
    }
}
