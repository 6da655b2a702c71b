//! Declarative method descriptions.
//!
//! A [`MethodDescriptor`] is the already-parsed form of an annotated API
//! method: ordered method-level [`Declaration`]s, one [`Parameter`] per
//! argument (declared type plus its own declarations), and the declared
//! return type.
//!
//! # Example
//!
//! ```
//! use plier_core::{Declaration, MethodDescriptor, TypeDesc};
//!
//! let get_user = MethodDescriptor::new("UserApi::get_user")
//!     .returns(TypeDesc::call(TypeDesc::named("User")))
//!     .declare(Declaration::get("users/{id}"))
//!     .param(TypeDesc::string(), [Declaration::path("id")]);
//!
//! assert_eq!(get_user.parameters().len(), 1);
//! ```

use std::borrow::Cow;
use std::fmt;

use crate::{Method, TypeDesc};

/// Default `Content-Transfer-Encoding` of multipart parts.
pub const DEFAULT_TRANSFER_ENCODING: &str = "binary";

/// Request body encoding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// `application/x-www-form-urlencoded` fields.
    FormUrlEncoded,
    /// `multipart/form-data` parts.
    Multipart,
}

/// How a parameter binds into the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Replaces the relative URL.
    Url,
    /// Substitutes the `{name}` placeholder of the path template.
    Path {
        /// Placeholder name.
        name: String,
        /// Value is already percent-encoded.
        encoded: bool,
    },
    /// Appends a `name=value` query parameter.
    Query {
        /// Parameter name.
        name: String,
        /// Value is already percent-encoded.
        encoded: bool,
    },
    /// Appends a value-less query parameter.
    QueryName {
        /// Name is already percent-encoded.
        encoded: bool,
    },
    /// Appends one query parameter per map entry.
    QueryMap {
        /// Entries are already percent-encoded.
        encoded: bool,
    },
    /// Adds a header.
    Header {
        /// Header name.
        name: String,
    },
    /// Adds one header per map entry.
    HeaderMap,
    /// Adds a form field.
    Field {
        /// Field name.
        name: String,
        /// Value is already percent-encoded.
        encoded: bool,
    },
    /// Adds one form field per map entry.
    FieldMap {
        /// Entries are already percent-encoded.
        encoded: bool,
    },
    /// Adds a multipart part.
    ///
    /// Without a name the value must already be a prepared `Part`.
    Part {
        /// Part name.
        name: Option<String>,
        /// `Content-Transfer-Encoding` of the part.
        encoding: String,
    },
    /// Adds one multipart part per map entry.
    PartMap {
        /// `Content-Transfer-Encoding` of each part.
        encoding: String,
    },
    /// Sets the request body.
    Body,
}

impl ParamKind {
    /// Short label used in diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Url => "Url",
            Self::Path { .. } => "Path",
            Self::Query { .. } => "Query",
            Self::QueryName { .. } => "QueryName",
            Self::QueryMap { .. } => "QueryMap",
            Self::Header { .. } => "Header",
            Self::HeaderMap => "HeaderMap",
            Self::Field { .. } => "Field",
            Self::FieldMap { .. } => "FieldMap",
            Self::Part { .. } => "Part",
            Self::PartMap { .. } => "PartMap",
            Self::Body => "Body",
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.label())
    }
}

/// One atomic piece of declarative metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Declaration {
    /// HTTP verb and relative path (may be empty when a `Url` parameter is used).
    Http {
        /// HTTP method.
        method: Method,
        /// Path template, e.g. `users/{id}`.
        path: String,
        /// Whether the request carries a body.
        has_body: bool,
    },
    /// Static `Name: Value` header lines.
    Headers(Vec<String>),
    /// Body encoding mode.
    Encoding(Encoding),
    /// Parameter binding.
    Param(ParamKind),
    /// Opaque metadata forwarded to converter and call adapter factories.
    Tag(Cow<'static, str>),
}

impl Declaration {
    /// Generic HTTP declaration.
    #[must_use]
    pub fn http(method: Method, path: impl Into<String>, has_body: bool) -> Self {
        Self::Http {
            method,
            path: path.into(),
            has_body,
        }
    }

    fn verb(method: Method, path: impl Into<String>) -> Self {
        Self::http(method, path, method.has_body_by_default())
    }

    /// `GET path`.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::verb(Method::Get, path)
    }

    /// `POST path`.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::verb(Method::Post, path)
    }

    /// `PUT path`.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::verb(Method::Put, path)
    }

    /// `DELETE path`.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::verb(Method::Delete, path)
    }

    /// `PATCH path`.
    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::verb(Method::Patch, path)
    }

    /// `HEAD path`.
    #[must_use]
    pub fn head(path: impl Into<String>) -> Self {
        Self::verb(Method::Head, path)
    }

    /// `OPTIONS path`.
    #[must_use]
    pub fn options(path: impl Into<String>) -> Self {
        Self::verb(Method::Options, path)
    }

    /// Static header lines.
    #[must_use]
    pub fn headers<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        Self::Headers(lines.into_iter().map(Into::into).collect())
    }

    /// Form URL-encoded body.
    #[must_use]
    pub const fn form_url_encoded() -> Self {
        Self::Encoding(Encoding::FormUrlEncoded)
    }

    /// Multipart body.
    #[must_use]
    pub const fn multipart() -> Self {
        Self::Encoding(Encoding::Multipart)
    }

    /// Opaque tag.
    #[must_use]
    pub fn tag(tag: impl Into<Cow<'static, str>>) -> Self {
        Self::Tag(tag.into())
    }

    /// `@Url` parameter.
    #[must_use]
    pub const fn url() -> Self {
        Self::Param(ParamKind::Url)
    }

    /// `@Path(name)` parameter.
    #[must_use]
    pub fn path(name: impl Into<String>) -> Self {
        Self::Param(ParamKind::Path {
            name: name.into(),
            encoded: false,
        })
    }

    /// `@Query(name)` parameter.
    #[must_use]
    pub fn query(name: impl Into<String>) -> Self {
        Self::Param(ParamKind::Query {
            name: name.into(),
            encoded: false,
        })
    }

    /// `@QueryName` parameter.
    #[must_use]
    pub const fn query_name() -> Self {
        Self::Param(ParamKind::QueryName { encoded: false })
    }

    /// `@QueryMap` parameter.
    #[must_use]
    pub const fn query_map() -> Self {
        Self::Param(ParamKind::QueryMap { encoded: false })
    }

    /// `@Header(name)` parameter.
    #[must_use]
    pub fn header(name: impl Into<String>) -> Self {
        Self::Param(ParamKind::Header { name: name.into() })
    }

    /// `@HeaderMap` parameter.
    #[must_use]
    pub const fn header_map() -> Self {
        Self::Param(ParamKind::HeaderMap)
    }

    /// `@Field(name)` parameter.
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Param(ParamKind::Field {
            name: name.into(),
            encoded: false,
        })
    }

    /// `@FieldMap` parameter.
    #[must_use]
    pub const fn field_map() -> Self {
        Self::Param(ParamKind::FieldMap { encoded: false })
    }

    /// Named `@Part(name)` parameter.
    #[must_use]
    pub fn part(name: impl Into<String>) -> Self {
        Self::Param(ParamKind::Part {
            name: Some(name.into()),
            encoding: DEFAULT_TRANSFER_ENCODING.to_string(),
        })
    }

    /// Unnamed `@Part` parameter carrying prepared parts.
    #[must_use]
    pub fn raw_part() -> Self {
        Self::Param(ParamKind::Part {
            name: None,
            encoding: DEFAULT_TRANSFER_ENCODING.to_string(),
        })
    }

    /// `@PartMap` parameter.
    #[must_use]
    pub fn part_map() -> Self {
        Self::Param(ParamKind::PartMap {
            encoding: DEFAULT_TRANSFER_ENCODING.to_string(),
        })
    }

    /// `@Body` parameter.
    #[must_use]
    pub const fn body() -> Self {
        Self::Param(ParamKind::Body)
    }

    /// Mark a parameter declaration as already percent-encoded.
    ///
    /// Has no effect on declarations without an `encoded` flag.
    #[must_use]
    pub fn encoded(mut self) -> Self {
        if let Self::Param(
            ParamKind::Path { encoded, .. }
            | ParamKind::Query { encoded, .. }
            | ParamKind::QueryName { encoded }
            | ParamKind::QueryMap { encoded }
            | ParamKind::Field { encoded, .. }
            | ParamKind::FieldMap { encoded },
        ) = &mut self
        {
            *encoded = true;
        }
        self
    }

    /// Override the transfer encoding of a `Part` or `PartMap` declaration.
    #[must_use]
    pub fn transfer_encoding(mut self, value: impl Into<String>) -> Self {
        if let Self::Param(ParamKind::Part { encoding, .. } | ParamKind::PartMap { encoding }) =
            &mut self
        {
            *encoding = value.into();
        }
        self
    }

    /// The parameter kind, for `Param` declarations.
    #[must_use]
    pub const fn as_param(&self) -> Option<&ParamKind> {
        match self {
            Self::Param(kind) => Some(kind),
            _ => None,
        }
    }

    /// Returns `true` if this is the tag `tag`.
    #[must_use]
    pub fn is_tag(&self, tag: &str) -> bool {
        matches!(self, Self::Tag(t) if t == tag)
    }
}

/// One declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    /// Declared type.
    pub ty: TypeDesc,
    /// Parameter-level declarations.
    pub declarations: Vec<Declaration>,
}

impl Parameter {
    /// Create a parameter.
    #[must_use]
    pub fn new(ty: TypeDesc, declarations: impl IntoIterator<Item = Declaration>) -> Self {
        Self {
            ty,
            declarations: declarations.into_iter().collect(),
        }
    }
}

/// Stable identity of a method, used as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey(String);

impl MethodKey {
    /// Create a key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parsed description of one API method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    name: String,
    declarations: Vec<Declaration>,
    parameters: Vec<Parameter>,
    return_type: TypeDesc,
}

impl MethodDescriptor {
    /// Create an empty descriptor.
    ///
    /// The name identifies the method in diagnostics and in the method cache,
    /// e.g. `UserApi::get_user`. The return type defaults to `Call<()>`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declarations: Vec::new(),
            parameters: Vec::new(),
            return_type: TypeDesc::call(TypeDesc::Unit),
        }
    }

    /// Set the declared return type.
    #[must_use]
    pub fn returns(mut self, return_type: TypeDesc) -> Self {
        self.return_type = return_type;
        self
    }

    /// Append a method-level declaration.
    #[must_use]
    pub fn declare(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Append a parameter.
    #[must_use]
    pub fn param(
        mut self,
        ty: TypeDesc,
        declarations: impl IntoIterator<Item = Declaration>,
    ) -> Self {
        self.parameters.push(Parameter::new(ty, declarations));
        self
    }

    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cache key of this method.
    #[must_use]
    pub fn key(&self) -> MethodKey {
        MethodKey::new(self.name.clone())
    }

    /// Method-level declarations, in order.
    #[must_use]
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Parameters, in position order.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Declared return type.
    #[must_use]
    pub const fn return_type(&self) -> &TypeDesc {
        &self.return_type
    }
}
