//! Declared types of method parameters and return values.
//!
//! A [`TypeDesc`] plays the role of a method signature type: converter and
//! call adapter factories are selected by matching on it, and the template
//! builder uses it to decide how a parameter binds (scalar, sequence, map).

use std::borrow::Cow;
use std::fmt;

/// Name of the text type.
pub const STRING: &str = "String";
/// Name of the absolute URL type.
pub const URL: &str = "Url";
/// Name of the URI reference type (accepted for relative URLs).
pub const URI: &str = "Uri";
/// Name of the raw byte payload type.
pub const BYTES: &str = "Bytes";
/// Name of the prepared multipart part type.
pub const PART: &str = "Part";
/// Name of the full response wrapper type.
pub const RESPONSE: &str = "Response";
/// Name of the in-flight call type.
pub const CALL: &str = "Call";
/// Name of the asynchronous result type.
pub const FUTURE: &str = "Future";
/// Name of the optional wrapper type.
pub const OPTION: &str = "Option";

/// A declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    /// No value (`()`).
    Unit,
    /// A named, non-generic type such as `String`, `u64` or `User`.
    Named(Cow<'static, str>),
    /// A growable sequence of elements (`Vec<T>`).
    Seq(Box<TypeDesc>),
    /// A fixed-size array of elements (`[T; N]`).
    Array(Box<TypeDesc>),
    /// A key/value mapping.
    Map(Box<TypeDesc>, Box<TypeDesc>),
    /// A generic wrapper such as `Call<User>` or `Future<Option<User>>`.
    Generic {
        /// Wrapper name.
        name: Cow<'static, str>,
        /// Type arguments.
        args: Vec<TypeDesc>,
    },
    /// An unresolved type variable or wildcard.
    Wildcard,
}

impl TypeDesc {
    /// A named type.
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Named(name.into())
    }

    /// The `String` type.
    #[must_use]
    pub const fn string() -> Self {
        Self::Named(Cow::Borrowed(STRING))
    }

    /// The `Url` type.
    #[must_use]
    pub const fn url() -> Self {
        Self::Named(Cow::Borrowed(URL))
    }

    /// The `Bytes` type.
    #[must_use]
    pub const fn bytes() -> Self {
        Self::Named(Cow::Borrowed(BYTES))
    }

    /// The multipart `Part` type.
    #[must_use]
    pub const fn part() -> Self {
        Self::Named(Cow::Borrowed(PART))
    }

    /// `Vec<T>`.
    #[must_use]
    pub fn seq(element: Self) -> Self {
        Self::Seq(Box::new(element))
    }

    /// `[T; N]`.
    #[must_use]
    pub fn array(element: Self) -> Self {
        Self::Array(Box::new(element))
    }

    /// A map from `key` to `value`.
    #[must_use]
    pub fn map(key: Self, value: Self) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// A generic wrapper.
    #[must_use]
    pub fn generic(name: impl Into<Cow<'static, str>>, args: Vec<Self>) -> Self {
        Self::Generic {
            name: name.into(),
            args,
        }
    }

    /// `Call<T>`.
    #[must_use]
    pub fn call(inner: Self) -> Self {
        Self::generic(CALL, vec![inner])
    }

    /// `Future<T>`.
    #[must_use]
    pub fn future(inner: Self) -> Self {
        Self::generic(FUTURE, vec![inner])
    }

    /// `Response<T>`.
    #[must_use]
    pub fn response(inner: Self) -> Self {
        Self::generic(RESPONSE, vec![inner])
    }

    /// `Option<T>`.
    #[must_use]
    pub fn option(inner: Self) -> Self {
        Self::generic(OPTION, vec![inner])
    }

    /// Returns `true` for `()`.
    #[must_use]
    pub const fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    /// Returns `true` if this is the named type `name`.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        matches!(self, Self::Named(n) if n == name)
    }

    /// Returns `true` if this is a `Generic` whose wrapper name is `name`.
    #[must_use]
    pub fn is_generic(&self, name: &str) -> bool {
        matches!(self, Self::Generic { name: n, .. } if n == name)
    }

    /// Raw name of the type, ignoring type arguments.
    ///
    /// `Response` and `Response<T>` both have the raw name `Response`.
    #[must_use]
    pub fn raw_name(&self) -> Option<&str> {
        match self {
            Self::Named(name) | Self::Generic { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The single type argument of the wrapper `name`, e.g. `T` for `Call<T>`.
    #[must_use]
    pub fn unwrap_generic(&self, name: &str) -> Option<&Self> {
        match self {
            Self::Generic { name: n, args } if n == name && args.len() == 1 => args.first(),
            _ => None,
        }
    }

    /// Element type of a sequence or array.
    #[must_use]
    pub fn element(&self) -> Option<&Self> {
        match self {
            Self::Seq(element) | Self::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Key and value types of a map.
    #[must_use]
    pub fn map_types(&self) -> Option<(&Self, &Self)> {
        match self {
            Self::Map(key, value) => Some((key, value)),
            _ => None,
        }
    }

    /// Returns `true` if a wildcard appears anywhere in this type.
    #[must_use]
    pub fn has_unresolvable(&self) -> bool {
        match self {
            Self::Wildcard => true,
            Self::Unit | Self::Named(_) => false,
            Self::Seq(element) | Self::Array(element) => element.has_unresolvable(),
            Self::Map(key, value) => key.has_unresolvable() || value.has_unresolvable(),
            Self::Generic { args, .. } => args.iter().any(Self::has_unresolvable),
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "()"),
            Self::Named(name) => write!(f, "{name}"),
            Self::Seq(element) => write!(f, "Vec<{element}>"),
            Self::Array(element) => write!(f, "[{element}]"),
            Self::Map(key, value) => write!(f, "Map<{key}, {value}>"),
            Self::Generic { name, args } => {
                write!(f, "{name}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
            Self::Wildcard => write!(f, "?"),
        }
    }
}

impl From<&'static str> for TypeDesc {
    fn from(name: &'static str) -> Self {
        Self::named(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_desc_display() {
        let ty = TypeDesc::call(TypeDesc::seq(TypeDesc::named("User")));
        assert_eq!(ty.to_string(), "Call<Vec<User>>");

        let ty = TypeDesc::map(TypeDesc::string(), TypeDesc::array(TypeDesc::named("u8")));
        assert_eq!(ty.to_string(), "Map<String, [u8]>");

        assert_eq!(TypeDesc::Unit.to_string(), "()");
    }

    #[test]
    fn type_desc_unwrap_generic() {
        let ty = TypeDesc::future(TypeDesc::option(TypeDesc::named("User")));
        let inner = ty.unwrap_generic(FUTURE).expect("future arg");
        assert!(inner.is_generic(OPTION));
        assert!(ty.unwrap_generic(CALL).is_none());
    }

    #[test]
    fn type_desc_raw_name() {
        assert_eq!(TypeDesc::response(TypeDesc::Unit).raw_name(), Some(RESPONSE));
        assert_eq!(TypeDesc::named(RESPONSE).raw_name(), Some(RESPONSE));
        assert_eq!(TypeDesc::seq(TypeDesc::string()).raw_name(), None);
    }

    #[test]
    fn type_desc_has_unresolvable() {
        assert!(TypeDesc::seq(TypeDesc::Wildcard).has_unresolvable());
        assert!(
            TypeDesc::map(TypeDesc::string(), TypeDesc::call(TypeDesc::Wildcard))
                .has_unresolvable()
        );
        assert!(!TypeDesc::map(TypeDesc::string(), TypeDesc::string()).has_unresolvable());
    }
}
