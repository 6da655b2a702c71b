//! Runtime argument and response values.
//!
//! Arguments bound into a request template, and bodies decoded from a
//! response, travel as [`Value`]. `Value::Null` stands for an absent
//! argument; handlers either skip it or reject it.
//!
//! # Example
//!
//! ```
//! use plier_core::Value;
//!
//! let args: Vec<Value> = vec!["42".into(), Some(10_u32).into(), Value::Null];
//! assert!(args[2].is_null());
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use bytes::Bytes;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use url::Url;

use crate::{Part, Result};

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Floating point number.
    Float(f64),
    /// Text.
    String(String),
    /// Raw bytes.
    Bytes(Bytes),
    /// URL.
    Url(Url),
    /// A prepared multipart part.
    Part(Part),
    /// Ordered elements.
    Seq(Vec<Value>),
    /// Ordered entries. Keys may be `Null` so that map handlers can reject them.
    Map(Vec<(Value, Value)>),
    /// Arbitrary structured data.
    Json(serde_json::Value),
}

impl Value {
    /// Build a map value from ordered entries.
    #[must_use]
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Self>,
        V: Into<Self>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Capture any serializable value as structured data.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Returns `true` for `Value::Null` and for a JSON `null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Json(serde_json::Value::Null))
    }

    /// The text content, for `String` values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Json(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::UInt(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Url(_) => "url",
            Self::Part(_) => "part",
            Self::Seq(_) => "sequence",
            Self::Map(_) => "map",
            Self::Json(_) => "json",
        }
    }

    /// Convert into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value holds a multipart part or a null map key.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        match self {
            Self::Json(value) => Ok(value.clone()),
            other => Ok(serde_json::to_value(other)?),
        }
    }

    /// Deserialize into a typed value, with path-aware errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not match `T`.
    ///
    /// # Example
    ///
    /// ```
    /// use plier_core::Value;
    ///
    /// let value = Value::Json(serde_json::json!({"id": 1}));
    /// #[derive(serde::Deserialize)]
    /// struct User { id: u64 }
    /// let user: User = value.deserialize().expect("user");
    /// assert_eq!(user.id, 1);
    /// ```
    pub fn deserialize<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        let json = match self {
            Self::Json(value) => value,
            other => serde_json::to_value(&other)?,
        };
        serde_path_to_error::deserialize(json).map_err(|e| {
            crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
        })
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::UInt(u) => serializer.serialize_u64(*u),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::Bytes(b) => serializer.serialize_bytes(b),
            Self::Url(url) => serializer.serialize_str(url.as_str()),
            Self::Part(part) => Err(S::Error::custom(format!(
                "multipart part '{}' cannot be serialized",
                part.name()
            ))),
            Self::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    if key.is_null() {
                        return Err(S::Error::custom("map contains a null key"));
                    }
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::Json(value) => value.serialize(serializer),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Url(url) => write!(f, "{url}"),
            Self::Part(part) => write!(f, "<part {}>", part.name()),
            Self::Seq(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Self::Json(value) => write!(f, "{value}"),
        }
    }
}

macro_rules! impl_from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Self::Int(i64::from(value))
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Self::UInt(u64::from(value))
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u8, u16, u32, u64);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Url> for Value {
    fn from(value: Url) -> Self {
        Self::Url(value)
    }
}

impl From<Part> for Value {
    fn from(value: Part) -> Self {
        Self::Part(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::Seq(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>, const N: usize> From<[T; N]> for Value {
    fn from(value: [T; N]) -> Self {
        Self::Seq(value.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<Self>, V: Into<Self>, S> From<HashMap<K, V, S>> for Value {
    fn from(value: HashMap<K, V, S>) -> Self {
        Self::map(value)
    }
}

impl<K: Into<Self>, V: Into<Self>> From<BTreeMap<K, V>> for Value {
    fn from(value: BTreeMap<K, V>) -> Self {
        Self::map(value)
    }
}
