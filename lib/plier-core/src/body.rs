//! Body serialization utilities.

use std::fmt;

use bytes::Bytes;

use crate::Result;

/// Well-known content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json; charset=UTF-8`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Plain text content type (`text/plain; charset=utf-8`).
    PlainText,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json; charset=UTF-8",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain; charset=utf-8",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns `true` if `value` looks like a `type/subtype` media type.
///
/// Parameters after `;` are allowed but not validated.
#[must_use]
pub fn is_media_type(value: &str) -> bool {
    let essence = value.split(';').next().unwrap_or_default().trim();
    let Some((ty, subtype)) = essence.split_once('/') else {
        return false;
    };
    let token = |s: &str| {
        !s.is_empty()
            && s.bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"!#$&^_.+-".contains(&b))
    };
    token(ty) && token(subtype)
}

/// Serialized bytes plus their content type.
///
/// Produced by request body converters and consumed by response converters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload {
    content_type: Option<String>,
    bytes: Bytes,
}

impl Payload {
    /// Create a payload.
    #[must_use]
    pub fn new(content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            bytes: bytes.into(),
        }
    }

    /// Create a payload with no declared content type.
    #[must_use]
    pub fn untyped(bytes: impl Into<Bytes>) -> Self {
        Self {
            content_type: None,
            bytes: bytes.into(),
        }
    }

    /// Content type, if known.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Payload bytes.
    #[must_use]
    pub const fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Byte length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for an empty payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Replace the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Consume into (content type, bytes).
    #[must_use]
    pub fn into_parts(self) -> (Option<String>, Bytes) {
        (self.content_type, self.bytes)
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use plier_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Serialize a value to form URL-encoded bytes.
///
/// # Errors
///
/// Returns an error if form serialization fails.
///
/// # Example
///
/// ```
/// use plier_core::to_form;
///
/// let bytes = to_form(&[("name", "ada"), ("age", "30")]).expect("serialize");
/// assert_eq!(bytes.as_ref(), b"name=ada&age=30");
/// ```
pub fn to_form<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_urlencoded::to_string(value)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Errors
///
/// Returns an error if JSON deserialization fails, with the error message
/// including the path to the problematic field (e.g., "user.address.city").
///
/// # Example
///
/// ```
/// use plier_core::from_json;
/// use serde::Deserialize;
///
/// #[derive(Debug, PartialEq, Deserialize)]
/// struct User { name: String }
///
/// let bytes = br#"{"name":"Alice"}"#;
/// let user: User = from_json(bytes).expect("deserialize");
/// assert_eq!(user, User { name: "Alice".to_string() });
/// ```
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_as_str() {
        assert_eq!(ContentType::Json.as_str(), "application/json; charset=UTF-8");
        assert_eq!(
            ContentType::FormUrlEncoded.as_str(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(ContentType::PlainText.to_string(), "text/plain; charset=utf-8");
    }

    #[test]
    fn media_type_validation() {
        assert!(is_media_type("application/json"));
        assert!(is_media_type("text/plain; charset=utf-8"));
        assert!(is_media_type("application/vnd.api+json"));
        assert!(!is_media_type("json"));
        assert!(!is_media_type("/json"));
        assert!(!is_media_type("text/"));
        assert!(!is_media_type("text /plain"));
    }

    #[test]
    fn payload_parts() {
        let payload = Payload::new("text/plain", "hi");
        assert_eq!(payload.content_type(), Some("text/plain"));
        assert_eq!(payload.len(), 2);

        let payload = Payload::untyped(Bytes::new());
        assert!(payload.is_empty());
        assert_eq!(payload.content_type(), None);
        let (content_type, bytes) = payload.with_content_type("a/b").into_parts();
        assert_eq!(content_type.as_deref(), Some("a/b"));
        assert!(bytes.is_empty());
    }

    #[test]
    fn to_form_escapes_values() {
        let bytes = to_form(&[("q", "a b&c")]).expect("serialize");
        assert_eq!(bytes.as_ref(), b"q=a+b%26c");
    }

    #[test]
    fn from_json_missing_field_error_with_path() {
        #[derive(Debug, serde::Deserialize)]
        struct Address {
            #[allow(dead_code)]
            city: String,
        }

        #[derive(Debug, serde::Deserialize)]
        struct User {
            #[allow(dead_code)]
            address: Address,
        }

        let result: Result<User> = from_json(br#"{"address":{}}"#);
        let msg = result.expect_err("should fail").to_string();
        assert!(msg.contains("address"), "Expected path 'address' in error: {msg}");
        assert!(msg.contains("city"), "Expected field 'city' mentioned in error: {msg}");
    }

    #[test]
    fn from_json_syntax_error() {
        let result: Result<serde_json::Value> = from_json(b"not json");
        let err = result.expect_err("should fail");
        assert!(err.to_string().contains("JSON deserialization error"));
    }
}
