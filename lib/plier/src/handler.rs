//! Parameter handlers.
//!
//! One [`ParameterHandler`] per declared parameter folds the bound argument
//! into an [`InProgressRequest`]. Handlers are built once with their
//! converter and are immutable afterwards.
//!
//! Null policy:
//! - `Header`, `Query`, `QueryName`, `Field`, `Part`, `RawPart` skip null, and
//!   skip values their converter maps to nothing.
//! - `RelativeUrl`, `Path`, `Body` and every map handler reject null.
//! - Map handlers reject null keys, null values and values converted to nothing.

use std::sync::Arc;

use plier_core::{MapEntryFault, Value};

use crate::assembler::InProgressRequest;
use crate::converter::{RequestBodyConverter, StringConverter};
use crate::{Error, Result};

/// Binds one argument into the request.
#[derive(Debug, Clone)]
pub enum ParameterHandler {
    /// `@Url`: replaces the relative URL.
    RelativeUrl,
    /// `@Header(name)`.
    Header {
        /// Header name.
        name: String,
        /// Value converter.
        converter: Arc<dyn StringConverter>,
    },
    /// `@Path(name)`.
    Path {
        /// Placeholder name.
        name: String,
        /// Value is already percent-encoded.
        encoded: bool,
        /// Value converter.
        converter: Arc<dyn StringConverter>,
    },
    /// `@Query(name)`.
    Query {
        /// Parameter name.
        name: String,
        /// Value is already percent-encoded.
        encoded: bool,
        /// Value converter.
        converter: Arc<dyn StringConverter>,
    },
    /// `@QueryName`.
    QueryName {
        /// Name is already percent-encoded.
        encoded: bool,
        /// Value converter.
        converter: Arc<dyn StringConverter>,
    },
    /// `@QueryMap`.
    QueryMap {
        /// Entries are already percent-encoded.
        encoded: bool,
        /// Value converter.
        converter: Arc<dyn StringConverter>,
    },
    /// `@HeaderMap`.
    HeaderMap {
        /// Value converter.
        converter: Arc<dyn StringConverter>,
    },
    /// `@Field(name)`.
    Field {
        /// Field name.
        name: String,
        /// Value is already percent-encoded.
        encoded: bool,
        /// Value converter.
        converter: Arc<dyn StringConverter>,
    },
    /// `@FieldMap`.
    FieldMap {
        /// Entries are already percent-encoded.
        encoded: bool,
        /// Value converter.
        converter: Arc<dyn StringConverter>,
    },
    /// Named `@Part(name)`.
    Part {
        /// Part name.
        name: String,
        /// `Content-Transfer-Encoding`.
        transfer_encoding: String,
        /// Body converter.
        converter: Arc<dyn RequestBodyConverter>,
    },
    /// Unnamed `@Part` taking prepared parts.
    RawPart,
    /// `@PartMap`.
    PartMap {
        /// `Content-Transfer-Encoding` of each part.
        transfer_encoding: String,
        /// Body converter.
        converter: Arc<dyn RequestBodyConverter>,
    },
    /// `@Body`.
    Body {
        /// Body converter.
        converter: Arc<dyn RequestBodyConverter>,
    },
    /// Applies the inner handler to every element of a sequence.
    Sequence(Box<ParameterHandler>),
    /// Applies the inner handler to every element of a fixed-size array.
    FixedArray(Box<ParameterHandler>),
}

impl ParameterHandler {
    /// Lift into a sequence handler.
    #[must_use]
    pub fn sequence(self) -> Self {
        Self::Sequence(Box::new(self))
    }

    /// Lift into an array handler.
    #[must_use]
    pub fn fixed_array(self) -> Self {
        Self::FixedArray(Box::new(self))
    }

    /// Short description used in error messages, e.g. `@Path("id")`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::RelativeUrl => "@Url".to_string(),
            Self::Header { name, .. } => format!("@Header(\"{name}\")"),
            Self::Path { name, .. } => format!("@Path(\"{name}\")"),
            Self::Query { name, .. } => format!("@Query(\"{name}\")"),
            Self::QueryName { .. } => "@QueryName".to_string(),
            Self::QueryMap { .. } => "@QueryMap".to_string(),
            Self::HeaderMap { .. } => "@HeaderMap".to_string(),
            Self::Field { name, .. } => format!("@Field(\"{name}\")"),
            Self::FieldMap { .. } => "@FieldMap".to_string(),
            Self::Part { name, .. } => format!("@Part(\"{name}\")"),
            Self::RawPart => "@Part".to_string(),
            Self::PartMap { .. } => "@PartMap".to_string(),
            Self::Body { .. } => "@Body".to_string(),
            Self::Sequence(inner) | Self::FixedArray(inner) => inner.describe(),
        }
    }

    /// Fold `value` into `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is rejected by the null policy, has the
    /// wrong shape, or fails to convert.
    pub fn apply(&self, request: &mut InProgressRequest, value: Value) -> Result<()> {
        match self {
            Self::Sequence(inner) | Self::FixedArray(inner) => {
                for element in elements(value, || self.describe())? {
                    inner.apply(request, element)?;
                }
                Ok(())
            }
            Self::RelativeUrl => {
                let url = match value {
                    Value::Url(url) => url.to_string(),
                    Value::String(url) | Value::Json(serde_json::Value::String(url)) => url,
                    other if other.is_null() => return Err(self.required()),
                    other => {
                        return Err(Error::invalid_argument(format!(
                            "@Url expects a URL or a string, got {}",
                            other.kind()
                        )));
                    }
                };
                request.set_relative_url(url);
                Ok(())
            }
            Self::Path {
                name,
                encoded,
                converter,
            } => {
                if value.is_null() {
                    return Err(self.required());
                }
                let converted = converter.convert(&value)?.ok_or_else(|| self.required())?;
                request.add_path_param(name, &converted, *encoded)
            }
            Self::Query {
                name,
                encoded,
                converter,
            } => {
                if let Some(converted) = convert_optional(converter.as_ref(), &value)? {
                    request.add_query_param(name, Some(&converted), *encoded);
                }
                Ok(())
            }
            Self::QueryName { encoded, converter } => {
                if let Some(converted) = convert_optional(converter.as_ref(), &value)? {
                    request.add_query_param(&converted, None, *encoded);
                }
                Ok(())
            }
            Self::Header { name, converter } => {
                match convert_optional(converter.as_ref(), &value)? {
                    Some(converted) => request.add_header(name, &converted),
                    None => Ok(()),
                }
            }
            Self::Field {
                name,
                encoded,
                converter,
            } => match convert_optional(converter.as_ref(), &value)? {
                Some(converted) => request.add_form_field(name, &converted, *encoded),
                None => Ok(()),
            },
            Self::QueryMap { encoded, converter } => {
                for (key, entry) in self.string_entries(value, converter.as_ref())? {
                    request.add_query_param(&key, Some(&entry), *encoded);
                }
                Ok(())
            }
            Self::HeaderMap { converter } => {
                for (key, entry) in self.string_entries(value, converter.as_ref())? {
                    request.add_header(&key, &entry)?;
                }
                Ok(())
            }
            Self::FieldMap { encoded, converter } => {
                for (key, entry) in self.string_entries(value, converter.as_ref())? {
                    request.add_form_field(&key, &entry, *encoded)?;
                }
                Ok(())
            }
            Self::Part {
                name,
                transfer_encoding,
                converter,
            } => {
                if value.is_null() {
                    return Ok(());
                }
                let payload = converter.convert(&value)?;
                request.add_part(name, transfer_encoding, payload)
            }
            Self::RawPart => match value {
                Value::Part(part) => request.add_raw_part(part),
                other if other.is_null() => Ok(()),
                other => Err(Error::invalid_argument(format!(
                    "@Part without a name expects a prepared part, got {}",
                    other.kind()
                ))),
            },
            Self::PartMap {
                transfer_encoding,
                converter,
            } => {
                for (key, entry) in self.map_entries(value)? {
                    let payload = converter.convert(&entry)?;
                    request.add_part(&key, transfer_encoding, payload)?;
                }
                Ok(())
            }
            Self::Body { converter } => {
                if value.is_null() {
                    return Err(self.required());
                }
                let payload = converter.convert(&value)?;
                request.set_body(payload);
                Ok(())
            }
        }
    }

    fn required(&self) -> Error {
        Error::RequiredParameterNull {
            parameter: self.describe(),
        }
    }

    fn map_label(&self) -> &'static str {
        match self {
            Self::QueryMap { .. } => "@QueryMap",
            Self::HeaderMap { .. } => "@HeaderMap",
            Self::FieldMap { .. } => "@FieldMap",
            _ => "@PartMap",
        }
    }

    /// Entries of a map argument, with null keys and values rejected.
    fn map_entries(&self, value: Value) -> Result<Vec<(String, Value)>> {
        let entries = match value {
            Value::Map(entries) => entries,
            Value::Json(serde_json::Value::Object(object)) => object
                .into_iter()
                .map(|(key, value)| (Value::String(key), Value::Json(value)))
                .collect(),
            other if other.is_null() => return Err(self.required()),
            other => {
                return Err(Error::invalid_argument(format!(
                    "{} expects a map, got {}",
                    self.map_label(),
                    other.kind()
                )));
            }
        };

        entries
            .into_iter()
            .map(|(key, value)| {
                if key.is_null() {
                    return Err(self.invalid_entry("null".to_string(), MapEntryFault::NullKey));
                }
                let key = key.as_str().map_or_else(|| key.to_string(), ToString::to_string);
                if value.is_null() {
                    return Err(self.invalid_entry(key, MapEntryFault::NullValue));
                }
                Ok((key, value))
            })
            .collect()
    }

    /// Map entries with their values converted to strings.
    fn string_entries(
        &self,
        value: Value,
        converter: &dyn StringConverter,
    ) -> Result<Vec<(String, String)>> {
        self.map_entries(value)?
            .into_iter()
            .map(|(key, value)| match converter.convert(&value)? {
                Some(converted) => Ok((key, converted)),
                None => Err(self.invalid_entry(key, MapEntryFault::ConvertedToNull)),
            })
            .collect()
    }

    fn invalid_entry(&self, key: String, fault: MapEntryFault) -> Error {
        Error::InvalidMapEntry {
            parameter: self.map_label(),
            key,
            fault,
        }
    }
}

/// Convert an optional argument; null and converted-to-nothing give `None`.
fn convert_optional(converter: &dyn StringConverter, value: &Value) -> Result<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }
    converter.convert(value)
}

/// Elements of a sequence argument; null is an empty sequence.
fn elements(value: Value, describe: impl Fn() -> String) -> Result<Vec<Value>> {
    match value {
        Value::Seq(items) => Ok(items),
        Value::Json(serde_json::Value::Array(items)) => {
            Ok(items.into_iter().map(Value::Json).collect())
        }
        other if other.is_null() => Ok(Vec::new()),
        other => Err(Error::invalid_argument(format!(
            "{} expects a sequence, got {}",
            describe(),
            other.kind()
        ))),
    }
}
