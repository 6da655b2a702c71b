//! Value conversion to and from wire representations.
//!
//! Converters are resolved once per method by a [`ConverterResolver`]: an
//! ordered list of [`ConverterFactory`] trait objects, where the first factory
//! returning `Some` wins.
//!
//! Resolution order:
//! 1. [`BuiltInConverters`] (`Bytes`, `String` and `()` bodies)
//! 2. user factories, in registration order (e.g. [`JsonConverterFactory`])
//! 3. [`ToStringConverterFactory`], the fallback for string conversion
//!
//! There is no fallback for body conversion.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use plier_core::{BuildErrorKind, ContentType, Declaration, Payload, TypeDesc, Value, types};

use crate::{Error, Result};

/// Converts an argument to its string form (path, query, header, field).
pub trait StringConverter: fmt::Debug + Send + Sync {
    /// Converter name, used in error messages.
    fn name(&self) -> &str;

    /// Convert a value.
    ///
    /// `Ok(None)` means the value converted to nothing; the handler decides
    /// whether that is skipped or rejected.
    fn convert(&self, value: &Value) -> Result<Option<String>>;
}

/// Converts an argument to a request body (body, multipart part).
pub trait RequestBodyConverter: fmt::Debug + Send + Sync {
    /// Converter name, used in error messages.
    fn name(&self) -> &str;

    /// Convert a value.
    fn convert(&self, value: &Value) -> Result<Payload>;
}

/// Converts a response body to a value.
pub trait ResponseConverter: fmt::Debug + Send + Sync {
    /// Converter name, used in error messages.
    fn name(&self) -> &str;

    /// Convert a body.
    fn convert(&self, body: Payload) -> Result<Value>;
}

/// Creates converters for the types it understands.
///
/// Every method defaults to `None` (not handled). Declarations are passed
/// through untouched so that factories can react to [`Declaration::Tag`]s.
pub trait ConverterFactory: fmt::Debug + Send + Sync {
    /// Converter from a response body to `ty`.
    fn response_converter(
        &self,
        _ty: &TypeDesc,
        _method_declarations: &[Declaration],
    ) -> Option<Arc<dyn ResponseConverter>> {
        None
    }

    /// Converter from `ty` to a request body.
    fn request_body_converter(
        &self,
        _ty: &TypeDesc,
        _parameter_declarations: &[Declaration],
        _method_declarations: &[Declaration],
    ) -> Option<Arc<dyn RequestBodyConverter>> {
        None
    }

    /// Converter from `ty` to a string.
    fn string_converter(
        &self,
        _ty: &TypeDesc,
        _declarations: &[Declaration],
    ) -> Option<Arc<dyn StringConverter>> {
        None
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Ordered chain of converter factories.
#[derive(Debug, Clone)]
pub struct ConverterResolver {
    factories: Vec<Arc<dyn ConverterFactory>>,
}

impl Default for ConverterResolver {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ConverterResolver {
    /// Create a resolver around user factories.
    ///
    /// Built-in converters come first and the string fallback last.
    #[must_use]
    pub fn new(factories: Vec<Arc<dyn ConverterFactory>>) -> Self {
        let mut all: Vec<Arc<dyn ConverterFactory>> = Vec::with_capacity(factories.len() + 2);
        all.push(Arc::new(BuiltInConverters));
        all.extend(factories);
        all.push(Arc::new(ToStringConverterFactory));
        Self { factories: all }
    }

    /// Resolve a string converter.
    ///
    /// # Errors
    ///
    /// Returns [`BuildErrorKind::NoConverterFound`] if no factory handles `ty`.
    pub fn string_converter(
        &self,
        ty: &TypeDesc,
        declarations: &[Declaration],
    ) -> std::result::Result<Arc<dyn StringConverter>, BuildErrorKind> {
        self.factories
            .iter()
            .find_map(|factory| factory.string_converter(ty, declarations))
            .ok_or_else(|| not_found("string", ty))
    }

    /// Resolve a request body converter.
    ///
    /// # Errors
    ///
    /// Returns [`BuildErrorKind::NoConverterFound`] if no factory handles `ty`.
    pub fn request_body_converter(
        &self,
        ty: &TypeDesc,
        parameter_declarations: &[Declaration],
        method_declarations: &[Declaration],
    ) -> std::result::Result<Arc<dyn RequestBodyConverter>, BuildErrorKind> {
        self.factories
            .iter()
            .find_map(|factory| {
                factory.request_body_converter(ty, parameter_declarations, method_declarations)
            })
            .ok_or_else(|| not_found("request body", ty))
    }

    /// Resolve a response converter.
    ///
    /// # Errors
    ///
    /// Returns [`BuildErrorKind::NoConverterFound`] if no factory handles `ty`.
    pub fn response_converter(
        &self,
        ty: &TypeDesc,
        method_declarations: &[Declaration],
    ) -> std::result::Result<Arc<dyn ResponseConverter>, BuildErrorKind> {
        self.factories
            .iter()
            .find_map(|factory| factory.response_converter(ty, method_declarations))
            .ok_or_else(|| not_found("response", ty))
    }
}

fn not_found(purpose: &'static str, ty: &TypeDesc) -> BuildErrorKind {
    BuildErrorKind::NoConverterFound {
        purpose,
        ty: ty.to_string(),
    }
}

// ============================================================================
// Built-in converters
// ============================================================================

/// Raw bodies: `Bytes`, `String` and `()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltInConverters;

impl ConverterFactory for BuiltInConverters {
    fn response_converter(
        &self,
        ty: &TypeDesc,
        _method_declarations: &[Declaration],
    ) -> Option<Arc<dyn ResponseConverter>> {
        if ty.is_unit() {
            Some(Arc::new(UnitResponseConverter))
        } else if ty.is_named(types::BYTES) {
            Some(Arc::new(BytesConverter))
        } else if ty.is_named(types::STRING) {
            Some(Arc::new(TextConverter))
        } else {
            None
        }
    }

    fn request_body_converter(
        &self,
        ty: &TypeDesc,
        _parameter_declarations: &[Declaration],
        _method_declarations: &[Declaration],
    ) -> Option<Arc<dyn RequestBodyConverter>> {
        if ty.is_named(types::BYTES) {
            Some(Arc::new(BytesConverter))
        } else if ty.is_named(types::STRING) {
            Some(Arc::new(TextConverter))
        } else {
            None
        }
    }
}

/// Discards the response body.
#[derive(Debug, Clone, Copy)]
struct UnitResponseConverter;

impl ResponseConverter for UnitResponseConverter {
    fn name(&self) -> &'static str {
        "UnitResponseConverter"
    }

    fn convert(&self, _body: Payload) -> Result<Value> {
        Ok(Value::Null)
    }
}

/// `application/octet-stream` passthrough.
#[derive(Debug, Clone, Copy)]
struct BytesConverter;

impl BytesConverter {
    const NAME: &'static str = "BytesConverter";
}

impl RequestBodyConverter for BytesConverter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn convert(&self, value: &Value) -> Result<Payload> {
        match value {
            Value::Bytes(bytes) => Ok(Payload::new(ContentType::OctetStream.as_str(), bytes.clone())),
            other => Err(Error::conversion(other, Self::NAME, "expected bytes")),
        }
    }
}

impl ResponseConverter for BytesConverter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn convert(&self, body: Payload) -> Result<Value> {
        let (_, bytes) = body.into_parts();
        Ok(Value::Bytes(bytes))
    }
}

/// UTF-8 text.
#[derive(Debug, Clone, Copy)]
struct TextConverter;

impl TextConverter {
    const NAME: &'static str = "TextConverter";
}

impl RequestBodyConverter for TextConverter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn convert(&self, value: &Value) -> Result<Payload> {
        let text = value
            .as_str()
            .ok_or_else(|| Error::conversion(value, Self::NAME, "expected a string"))?;
        Ok(Payload::new(
            ContentType::PlainText.as_str(),
            Bytes::copy_from_slice(text.as_bytes()),
        ))
    }
}

impl ResponseConverter for TextConverter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn convert(&self, body: Payload) -> Result<Value> {
        let (_, bytes) = body.into_parts();
        String::from_utf8(bytes.to_vec())
            .map(Value::String)
            .map_err(|err| Error::conversion(format!("<{} bytes>", bytes.len()), Self::NAME, err))
    }
}

// ============================================================================
// JSON
// ============================================================================

/// JSON bodies for every type.
///
/// Register it with `ApiClientBuilder::converter_factory`. Since it accepts
/// every type, factories registered after it are never asked for bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverterFactory;

impl ConverterFactory for JsonConverterFactory {
    fn response_converter(
        &self,
        _ty: &TypeDesc,
        _method_declarations: &[Declaration],
    ) -> Option<Arc<dyn ResponseConverter>> {
        Some(Arc::new(JsonConverter))
    }

    fn request_body_converter(
        &self,
        _ty: &TypeDesc,
        _parameter_declarations: &[Declaration],
        _method_declarations: &[Declaration],
    ) -> Option<Arc<dyn RequestBodyConverter>> {
        Some(Arc::new(JsonConverter))
    }
}

#[derive(Debug, Clone, Copy)]
struct JsonConverter;

impl JsonConverter {
    const NAME: &'static str = "JsonConverter";
}

impl RequestBodyConverter for JsonConverter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn convert(&self, value: &Value) -> Result<Payload> {
        let json = value
            .to_json()
            .map_err(|err| Error::conversion(value, Self::NAME, err))?;
        let bytes = plier_core::to_json(&json)?;
        Ok(Payload::new(ContentType::Json.as_str(), bytes))
    }
}

impl ResponseConverter for JsonConverter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn convert(&self, body: Payload) -> Result<Value> {
        let json: serde_json::Value = plier_core::from_json(body.bytes())?;
        Ok(Value::Json(json))
    }
}

// ============================================================================
// String fallback
// ============================================================================

/// Stringifies scalars; always registered last.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToStringConverterFactory;

impl ConverterFactory for ToStringConverterFactory {
    fn string_converter(
        &self,
        _ty: &TypeDesc,
        _declarations: &[Declaration],
    ) -> Option<Arc<dyn StringConverter>> {
        Some(Arc::new(ToStringConverter))
    }
}

#[derive(Debug, Clone, Copy)]
struct ToStringConverter;

impl StringConverter for ToStringConverter {
    fn name(&self) -> &'static str {
        "ToStringConverter"
    }

    fn convert(&self, value: &Value) -> Result<Option<String>> {
        match value {
            Value::Null | Value::Json(serde_json::Value::Null) => Ok(None),
            Value::Bool(b) => Ok(Some(b.to_string())),
            Value::Int(i) => Ok(Some(i.to_string())),
            Value::UInt(u) => Ok(Some(u.to_string())),
            Value::Float(f) => Ok(Some(f.to_string())),
            Value::String(s) | Value::Json(serde_json::Value::String(s)) => Ok(Some(s.clone())),
            Value::Url(url) => Ok(Some(url.to_string())),
            Value::Json(json) => Ok(Some(json.to_string())),
            other => Err(Error::conversion(
                other,
                self.name(),
                format!("cannot convert {} to a string", other.kind()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[derive(Debug)]
    struct Upper;

    impl StringConverter for Upper {
        fn name(&self) -> &'static str {
            "Upper"
        }

        fn convert(&self, value: &Value) -> Result<Option<String>> {
            Ok(value.as_str().map(str::to_uppercase))
        }
    }

    /// Handles strings tagged `upper`.
    #[derive(Debug)]
    struct UpperFactory;

    impl ConverterFactory for UpperFactory {
        fn string_converter(
            &self,
            ty: &TypeDesc,
            declarations: &[Declaration],
        ) -> Option<Arc<dyn StringConverter>> {
            (ty.is_named(types::STRING) && declarations.iter().any(|d| d.is_tag("upper")))
                .then(|| Arc::new(Upper) as Arc<dyn StringConverter>)
        }
    }

    #[test]
    fn user_factories_win_over_fallback() {
        let resolver = ConverterResolver::new(vec![Arc::new(UpperFactory)]);
        let tagged = [Declaration::query("q"), Declaration::tag("upper")];

        let converter = resolver
            .string_converter(&TypeDesc::string(), &tagged)
            .expect("converter");
        check!(converter.name() == "Upper");

        let converter = resolver
            .string_converter(&TypeDesc::string(), &[Declaration::query("q")])
            .expect("converter");
        check!(converter.name() == "ToStringConverter");
    }

    #[test]
    fn no_body_fallback() {
        let resolver = ConverterResolver::default();
        let result = resolver.request_body_converter(&TypeDesc::named("User"), &[], &[]);
        let_assert!(Err(BuildErrorKind::NoConverterFound { purpose, ty }) = result);
        check!(purpose == "request body");
        check!(ty == "User");
    }

    #[test]
    fn built_in_response_converters() {
        let resolver = ConverterResolver::default();
        let payload = || Payload::untyped("hello");

        let unit = resolver.response_converter(&TypeDesc::Unit, &[]).expect("unit");
        check!(unit.convert(payload()).expect("unit") == Value::Null);

        let text = resolver.response_converter(&TypeDesc::string(), &[]).expect("text");
        check!(text.convert(payload()).expect("text") == Value::from("hello"));

        let bytes = resolver.response_converter(&TypeDesc::bytes(), &[]).expect("bytes");
        check!(bytes.convert(payload()).expect("bytes") == Value::Bytes(Bytes::from("hello")));
    }

    #[test]
    fn text_response_rejects_invalid_utf8() {
        let text = TextConverter;
        let result = ResponseConverter::convert(&text, Payload::untyped(vec![0xFF, 0xFE]));
        let_assert!(Err(Error::Conversion { converter, .. }) = result);
        check!(converter == "TextConverter");
    }

    #[test]
    fn to_string_converter() {
        let converter = ToStringConverter;
        check!(converter.convert(&Value::from(42_u32)).expect("int") == Some("42".to_string()));
        check!(converter.convert(&Value::from(true)).expect("bool") == Some("true".to_string()));
        check!(converter.convert(&Value::Null).expect("null") == None);
        check!(
            converter
                .convert(&Value::Json(serde_json::json!("x")))
                .expect("json string")
                == Some("x".to_string())
        );

        let result = converter.convert(&Value::from(vec![1_u32, 2]));
        let_assert!(Err(Error::Conversion { value, .. }) = result);
        check!(value == "[1, 2]");
    }

    #[test]
    fn json_round_trip() {
        let values = [
            serde_json::json!({"name": "ada", "tags": ["x", "y"], "age": 36}),
            serde_json::json!({}),
            serde_json::json!([]),
            serde_json::json!(""),
            serde_json::json!(0),
            serde_json::json!(u64::MAX),
            serde_json::json!(i64::MIN),
            serde_json::json!(null),
        ];

        for value in values {
            let payload = RequestBodyConverter::convert(&JsonConverter, &Value::Json(value.clone()))
                .expect("encode");
            check!(payload.content_type() == Some("application/json; charset=UTF-8"));
            let decoded = ResponseConverter::convert(&JsonConverter, payload).expect("decode");
            check!(decoded == Value::Json(value));
        }
    }

    #[test]
    fn json_body_from_dynamic_value() {
        let value = Value::map([("id", Value::from(7_u32)), ("ok", Value::from(true))]);
        let payload = RequestBodyConverter::convert(&JsonConverter, &value).expect("encode");
        check!(payload.bytes().as_ref() == br#"{"id":7,"ok":true}"#);
    }
}
