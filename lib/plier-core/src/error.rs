//! Error types for plier.
//!
//! Two families: [`BuildError`] for problems found while compiling a method
//! description (reported once, cached with the method), and [`Error`] for
//! everything that can go wrong while invoking a compiled method.

use std::fmt;

use derive_more::{Display, Error, From};

// ============================================================================
// Build errors
// ============================================================================

/// Which parameter a build error is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamContext {
    /// Zero-based parameter position.
    pub index: usize,
    /// Declared parameter type, rendered.
    pub ty: String,
}

/// What is wrong with a method description.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[non_exhaustive]
pub enum BuildErrorKind {
    /// More than one HTTP method declaration.
    #[display("only one HTTP method is allowed (found {first} and {second})")]
    DuplicateHttpMethod {
        /// First declared verb.
        first: String,
        /// Second declared verb.
        second: String,
    },
    /// No HTTP method declaration.
    #[display("HTTP method declaration is required (e.g. GET, POST)")]
    MissingHttpMethod,
    /// A declaration whose content cannot be used.
    #[display("malformed declaration: {_0}")]
    MalformedDeclaration(String),
    /// Invalid `Content-Type` value.
    #[display("malformed content type: {_0}")]
    MalformedContentType(String),
    /// Both form and multipart encoding declared.
    #[display("only one encoding declaration is allowed")]
    ConflictingEncoding,
    /// Form or multipart encoding on a verb without body.
    #[display("{_0} can only be specified on HTTP methods with request body (e.g. POST)")]
    EncodingRequiresBody(&'static str),
    /// The query part of the path template contains placeholders.
    #[display(
        "URL query string \"{_0}\" must not have replace block; for dynamic query parameters use @Query"
    )]
    QueryPlaceholderInPath(String),
    /// Parameter type contains a wildcard.
    #[display("parameter type must not include a type variable or wildcard: {_0}")]
    UnresolvableType(String),
    /// Parameter without binding declaration.
    #[display("no binding declaration found")]
    NoParameterAnnotation,
    /// Parameter with more than one binding declaration.
    #[display("multiple binding declarations found, only one allowed")]
    MultipleAnnotationsOnParameter,
    /// `@Url` declared twice.
    #[display("multiple @Url method parameters found")]
    MultipleUrl,
    /// `@Url` with an unsupported type.
    #[display("@Url must be Url, String or Uri type")]
    InvalidUrlType,
    /// `@Url` together with a relative path in the HTTP declaration.
    #[display("@Url cannot be used with a relative path in the HTTP method declaration")]
    UrlWithMethodPath,
    /// `@Url` after a parameter kind it must precede.
    #[display("a @Url parameter must not come after a {_0} parameter")]
    UrlAfter(&'static str),
    /// `@Path` after a parameter kind it must precede.
    #[display("a @Path parameter must not come after a {_0} parameter")]
    PathAfter(&'static str),
    /// `@Path` together with `@Url`.
    #[display("@Path parameters may not be used with @Url")]
    PathWithUrl,
    /// `@Path` without a relative path in the HTTP declaration.
    #[display("@Path can only be used with relative url on the HTTP method declaration")]
    PathWithoutMethodPath,
    /// `@Path` name that is not a valid placeholder name.
    #[display("@Path parameter name must match {{[a-zA-Z][a-zA-Z0-9_-]*}}, found: {_0}")]
    InvalidPathName(String),
    /// `@Path` name with no placeholder in the template.
    #[display("URL \"{path}\" does not contain \"{{{name}}}\"")]
    UnknownPathPlaceholder {
        /// Path template.
        path: String,
        /// Parameter name.
        name: String,
    },
    /// Placeholder with no `@Path` parameter.
    #[display("URL placeholder \"{{{_0}}}\" has no matching @Path parameter")]
    UnboundPathPlaceholder(String),
    /// Map declaration on a non-map type.
    #[display("{_0} parameter type must be a map")]
    MapTypeRequired(&'static str),
    /// Map declaration whose key type is not `String`.
    #[display("{_0} keys must be of type String, found: {_1}")]
    MapKeyNotString(&'static str, String),
    /// `@Field`/`@FieldMap` outside form encoding.
    #[display("{_0} parameters can only be used with form encoding")]
    FieldRequiresFormEncoding(&'static str),
    /// `@Part`/`@PartMap` outside multipart encoding.
    #[display("{_0} parameters can only be used with multipart encoding")]
    PartRequiresMultipart(&'static str),
    /// Unnamed `@Part` with a type other than `Part`.
    #[display("@Part annotation must supply a name or use Part parameter type")]
    PartNameRequired,
    /// Named `@Part` with the `Part` type.
    #[display("@Part parameters using the Part type must not include a part name")]
    RawPartWithName,
    /// `@PartMap` with `Part` values.
    #[display("@PartMap values cannot be Part; use @Part Vec<Part> or a different value type")]
    PartMapRawPartValue,
    /// `@Body` in form or multipart mode.
    #[display("@Body parameters cannot be used with form or multipart encoding")]
    BodyWithEncoding,
    /// `@Body` declared twice.
    #[display("multiple @Body method parameters found")]
    MultipleBody,
    /// Neither a relative path nor a `@Url` parameter.
    #[display("missing either @{verb} URL or @Url parameter")]
    MissingUrl {
        /// HTTP verb.
        verb: String,
    },
    /// `@Body` on a verb without body.
    #[display("non-body HTTP method cannot contain @Body")]
    BodyWithoutRequestBody,
    /// Form encoding without any field.
    #[display("form-encoded method must contain at least one @Field")]
    EmptyFormEncoding,
    /// Multipart encoding without any part.
    #[display("multipart method must contain at least one @Part")]
    EmptyMultipart,
    /// No converter factory handled the type.
    #[display("unable to create {purpose} converter for {ty}")]
    NoConverterFound {
        /// Which conversion was requested.
        purpose: &'static str,
        /// Target type.
        ty: String,
    },
    /// No call adapter factory handled the return type.
    #[display("unable to create call adapter for {_0}")]
    NoCallAdapterFound(String),
    /// The adapted response type is the raw response wrapper.
    #[display("'{_0}' is not a valid response body type; did you mean Bytes?")]
    InvalidResponseType(String),
    /// `HEAD` with a body type.
    #[display("HEAD method must use () as response type")]
    HeadMustReturnVoid,
    /// Methods must not return `()`.
    #[display("service methods cannot return ()")]
    UnitReturnType,
}

/// A method description that cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct BuildError {
    /// Method name.
    #[error(not(source))]
    pub method: String,
    /// Offending parameter, when the problem is parameter-specific.
    #[error(not(source))]
    pub parameter: Option<ParamContext>,
    /// What is wrong.
    #[error(not(source))]
    pub kind: BuildErrorKind,
}

impl BuildError {
    /// A method-level error.
    #[must_use]
    pub fn method(method: impl Into<String>, kind: BuildErrorKind) -> Self {
        Self {
            method: method.into(),
            parameter: None,
            kind,
        }
    }

    /// A parameter-level error.
    #[must_use]
    pub fn parameter(
        method: impl Into<String>,
        index: usize,
        ty: impl fmt::Display,
        kind: BuildErrorKind,
    ) -> Self {
        Self {
            method: method.into(),
            parameter: Some(ParamContext {
                index,
                ty: ty.to_string(),
            }),
            kind,
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parameter {
            Some(param) => write!(
                f,
                "{} (parameter #{}: {}) for method {}",
                self.kind,
                param.index + 1,
                param.ty,
                self.method
            ),
            None => write!(f, "{} for method {}", self.kind, self.method),
        }
    }
}

// ============================================================================
// Call errors
// ============================================================================

/// Why a map entry was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MapEntryFault {
    /// The key is null.
    #[display("null key")]
    NullKey,
    /// The value is null.
    #[display("null value")]
    NullValue,
    /// The converter produced no value.
    #[display("value converted to null")]
    ConvertedToNull,
}

/// Main error type for plier operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// HTTP-level errors (non-2xx status codes).
    #[display("HTTP error {status}: {message}")]
    #[from(skip)]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
        /// Response body, if available.
        #[error(not(source))]
        body: Option<bytes::Bytes>,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// Form URL-encoded serialization error.
    #[display("form serialization error: {_0}")]
    #[from]
    FormSerialization(serde_urlencoded::ser::Error),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// The method description failed to compile.
    #[display("{_0}")]
    #[from]
    Build(BuildError),

    /// Wrong number of arguments for a compiled method.
    #[display("argument count ({actual}) doesn't match expected count ({expected})")]
    #[from(skip)]
    ArgumentCountMismatch {
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        actual: usize,
    },

    /// A parameter that does not accept null received null.
    #[display("{parameter} parameter value must not be null")]
    #[from(skip)]
    RequiredParameterNull {
        /// Parameter description, e.g. `@Path("id")`.
        #[error(not(source))]
        parameter: String,
    },

    /// A map parameter contains an unusable entry.
    #[display("{parameter} contained {fault} for key '{key}'")]
    #[from(skip)]
    InvalidMapEntry {
        /// Parameter kind, e.g. `@QueryMap`.
        parameter: &'static str,
        /// Offending key (`null` for a null key).
        key: String,
        /// What is wrong with the entry.
        fault: MapEntryFault,
    },

    /// The argument shape does not fit the parameter.
    #[display("invalid argument: {_0}")]
    #[from(skip)]
    InvalidArgument(#[error(not(source))] String),

    /// A converter failed.
    #[display("unable to convert {value} with {converter}: {message}")]
    #[from(skip)]
    Conversion {
        /// Rendered value.
        value: String,
        /// Converter name.
        converter: String,
        /// Cause.
        message: String,
    },

    /// The call was canceled.
    #[display("call canceled")]
    #[from(skip)]
    Canceled,

    /// The adapted return value is not of the requested type.
    #[display("adapted return value is not a {expected}")]
    #[from(skip)]
    ReturnTypeMismatch {
        /// Requested Rust type.
        expected: &'static str,
    },
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an HTTP error from status code and message.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body: None,
        }
    }

    /// Create an HTTP error with body.
    #[must_use]
    pub fn http_with_body(status: u16, message: impl Into<String>, body: bytes::Bytes) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body: Some(body),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a conversion error.
    #[must_use]
    pub fn conversion(
        value: impl fmt::Display,
        converter: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        Self::Conversion {
            value: value.to_string(),
            converter: converter.into(),
            message: message.to_string(),
        }
    }

    /// Create an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the call was canceled.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Returns the HTTP status code if this is an HTTP error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..600).contains(&s))
    }

    /// Returns `true` if this is a 404 Not Found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns the response body if this is an HTTP error with a body.
    #[must_use]
    pub fn body(&self) -> Option<&bytes::Bytes> {
        match self {
            Self::Http { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Try to decode the HTTP error body as JSON.
    ///
    /// Returns `None` if there is no body or this is not an HTTP error.
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T>> {
        self.body().map(|body| crate::from_json(body))
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    #[test]
    fn error_display() {
        let err = Error::http(404, "Not Found");
        assert_eq!(err.to_string(), "HTTP error 404: Not Found");

        let err = Error::Timeout;
        assert_eq!(err.to_string(), "request timeout");

        let err = Error::json_deserialization("user.address.city", "missing field `city`");
        assert_eq!(
            err.to_string(),
            "JSON deserialization error at 'user.address.city': missing field `city`"
        );

        let err = Error::InvalidMapEntry {
            parameter: "@QueryMap",
            key: "page".to_string(),
            fault: MapEntryFault::NullValue,
        };
        assert_eq!(err.to_string(), "@QueryMap contained null value for key 'page'");

        let err = Error::ArgumentCountMismatch {
            expected: 2,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "argument count (1) doesn't match expected count (2)"
        );
    }

    #[test]
    fn build_error_display() {
        let err = BuildError::method("Api::get", BuildErrorKind::MissingHttpMethod);
        assert_eq!(
            err.to_string(),
            "HTTP method declaration is required (e.g. GET, POST) for method Api::get"
        );

        let err = BuildError::parameter(
            "Api::get",
            0,
            "String",
            BuildErrorKind::UnknownPathPlaceholder {
                path: "users/{id}".to_string(),
                name: "user".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "URL \"users/{id}\" does not contain \"{user}\" (parameter #1: String) for method Api::get"
        );
    }

    #[test]
    fn build_error_kind_messages() {
        insta::assert_snapshot!(
            BuildErrorKind::QueryPlaceholderInPath("sort={sort}".to_string()),
            @r#"URL query string "sort={sort}" must not have replace block; for dynamic query parameters use @Query"#
        );
        insta::assert_snapshot!(
            BuildErrorKind::InvalidPathName("1d".to_string()),
            @"@Path parameter name must match {[a-zA-Z][a-zA-Z0-9_-]*}, found: 1d"
        );
        insta::assert_snapshot!(
            BuildErrorKind::UnboundPathPlaceholder("id".to_string()),
            @r#"URL placeholder "{id}" has no matching @Path parameter"#
        );
        insta::assert_snapshot!(
            BuildErrorKind::MapKeyNotString("@HeaderMap", "u32".to_string()),
            @"@HeaderMap keys must be of type String, found: u32"
        );
        insta::assert_snapshot!(
            BuildErrorKind::MissingUrl { verb: "GET".to_string() },
            @"missing either @GET URL or @Url parameter"
        );
    }

    #[test]
    fn parameter_context_is_one_based_in_messages() {
        let err = BuildError::parameter("Api::find", 2, "Vec<?>", BuildErrorKind::MultipleBody);
        check!(err.parameter == Some(ParamContext { index: 2, ty: "Vec<?>".to_string() }));
        check!(err.to_string().contains("(parameter #3: Vec<?>)"));
    }

    #[test]
    fn build_error_converts_into_error() {
        let err: Error = BuildError::method("Api::get", BuildErrorKind::EmptyMultipart).into();
        assert!(matches!(
            err,
            Error::Build(BuildError {
                kind: BuildErrorKind::EmptyMultipart,
                ..
            })
        ));
    }

    #[test]
    fn error_status() {
        let err = Error::http(404, "Not Found");
        assert_eq!(err.status(), Some(404));
        assert!(err.is_client_error());
        assert!(err.is_not_found());
        assert!(!err.is_server_error());

        let err = Error::http(503, "Service Unavailable");
        assert!(err.is_server_error());

        assert_eq!(Error::Canceled.status(), None);
        assert!(Error::Canceled.is_canceled());
        assert!(Error::Timeout.is_timeout());
        assert!(Error::connection("refused").is_connection());
    }

    #[test]
    fn error_decode_body() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct ApiError {
            error: String,
        }

        let body = bytes::Bytes::from(r#"{"error": "not found"}"#);
        let err = Error::http_with_body(404, "Not Found", body);

        let decoded = err
            .decode_body::<ApiError>()
            .expect("should have body")
            .expect("should decode");
        assert_eq!(
            decoded,
            ApiError {
                error: "not found".to_string()
            }
        );

        assert!(Error::http(404, "Not Found").decode_body::<ApiError>().is_none());
        assert!(Error::Timeout.decode_body::<ApiError>().is_none());
    }
}
