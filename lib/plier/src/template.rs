//! Request templates.
//!
//! [`RequestTemplateBuilder`] runs the one-time static analysis of a
//! [`MethodDescriptor`]: it folds the method declarations, validates every
//! parameter against the HTTP method, encoding and path template, resolves
//! the converters, and produces an immutable [`RequestTemplate`].

use plier_core::{
    BuildError, BuildErrorKind, Declaration, Encoding, Method, MethodDescriptor, ParamKind,
    Parameter, PathTemplate, TypeDesc, is_media_type, types,
};
use tracing::debug;

use crate::converter::ConverterResolver;
use crate::handler::ParameterHandler;

/// Compiled form of one method.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    method_name: String,
    method: Method,
    relative_url: Option<PathTemplate>,
    path_param_names: Vec<String>,
    headers: Vec<(String, String)>,
    content_type: Option<String>,
    has_body: bool,
    is_form_encoded: bool,
    is_multipart: bool,
    handlers: Vec<ParameterHandler>,
}

impl RequestTemplate {
    /// Compile a method description.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] describing the first problem found.
    pub fn build(
        descriptor: &MethodDescriptor,
        converters: &ConverterResolver,
    ) -> Result<Self, BuildError> {
        RequestTemplateBuilder::new(descriptor, converters).build()
    }

    /// Method name.
    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Relative URL template, absent when a `@Url` parameter provides it.
    #[must_use]
    pub fn relative_url(&self) -> Option<&str> {
        self.relative_url.as_ref().map(PathTemplate::as_str)
    }

    /// Placeholder names of the relative URL, in first-seen order.
    #[must_use]
    pub fn path_param_names(&self) -> &[String] {
        &self.path_param_names
    }

    /// Static headers, in declaration order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Declared content type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Whether the request carries a body.
    #[must_use]
    pub const fn has_body(&self) -> bool {
        self.has_body
    }

    /// Form URL-encoded body.
    #[must_use]
    pub const fn is_form_encoded(&self) -> bool {
        self.is_form_encoded
    }

    /// Multipart body.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        self.is_multipart
    }

    /// Parameter handlers, by position.
    #[must_use]
    pub fn handlers(&self) -> &[ParameterHandler] {
        &self.handlers
    }
}

/// One-time static analysis of a method description.
#[derive(Debug)]
pub struct RequestTemplateBuilder<'a> {
    descriptor: &'a MethodDescriptor,
    converters: &'a ConverterResolver,

    method: Option<Method>,
    relative_url: Option<PathTemplate>,
    path_param_names: Vec<String>,
    headers: Vec<(String, String)>,
    content_type: Option<String>,
    has_body: bool,
    is_form_encoded: bool,
    is_multipart: bool,

    got_field: bool,
    got_part: bool,
    got_body: bool,
    got_path: bool,
    got_query: bool,
    got_query_name: bool,
    got_query_map: bool,
    got_url: bool,
    bound_paths: Vec<String>,
}

impl<'a> RequestTemplateBuilder<'a> {
    /// Create a builder.
    #[must_use]
    pub fn new(descriptor: &'a MethodDescriptor, converters: &'a ConverterResolver) -> Self {
        Self {
            descriptor,
            converters,
            method: None,
            relative_url: None,
            path_param_names: Vec::new(),
            headers: Vec::new(),
            content_type: None,
            has_body: false,
            is_form_encoded: false,
            is_multipart: false,
            got_field: false,
            got_part: false,
            got_body: false,
            got_path: false,
            got_query: false,
            got_query_name: false,
            got_query_map: false,
            got_url: false,
            bound_paths: Vec::new(),
        }
    }

    /// Run the analysis.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] describing the first problem found.
    pub fn build(mut self) -> Result<RequestTemplate, BuildError> {
        let descriptor = self.descriptor;
        debug!(method = descriptor.name(), "building request template");

        for declaration in descriptor.declarations() {
            self.parse_method_declaration(declaration)?;
        }

        let Some(method) = self.method else {
            return Err(self.error(BuildErrorKind::MissingHttpMethod));
        };
        if !self.has_body {
            if self.is_multipart {
                return Err(self.error(BuildErrorKind::EncodingRequiresBody("Multipart")));
            }
            if self.is_form_encoded {
                return Err(self.error(BuildErrorKind::EncodingRequiresBody("FormUrlEncoded")));
            }
        }

        let mut handlers = Vec::with_capacity(descriptor.parameters().len());
        for (index, parameter) in descriptor.parameters().iter().enumerate() {
            let handler = self
                .parse_parameter(parameter)
                .map_err(|kind| BuildError::parameter(descriptor.name(), index, &parameter.ty, kind))?;
            handlers.push(handler);
        }

        if self.relative_url.is_none() && !self.got_url {
            return Err(self.error(BuildErrorKind::MissingUrl {
                verb: method.to_string(),
            }));
        }
        if !self.is_form_encoded && !self.is_multipart && !self.has_body && self.got_body {
            return Err(self.error(BuildErrorKind::BodyWithoutRequestBody));
        }
        if self.is_form_encoded && !self.got_field {
            return Err(self.error(BuildErrorKind::EmptyFormEncoding));
        }
        if self.is_multipart && !self.got_part {
            return Err(self.error(BuildErrorKind::EmptyMultipart));
        }
        if let Some(unbound) = self
            .path_param_names
            .iter()
            .find(|name| !self.bound_paths.contains(*name))
        {
            return Err(self.error(BuildErrorKind::UnboundPathPlaceholder(unbound.clone())));
        }

        Ok(RequestTemplate {
            method_name: descriptor.name().to_string(),
            method,
            relative_url: self.relative_url,
            path_param_names: self.path_param_names,
            headers: self.headers,
            content_type: self.content_type,
            has_body: self.has_body,
            is_form_encoded: self.is_form_encoded,
            is_multipart: self.is_multipart,
            handlers,
        })
    }

    fn error(&self, kind: BuildErrorKind) -> BuildError {
        BuildError::method(self.descriptor.name(), kind)
    }

    fn parse_method_declaration(&mut self, declaration: &Declaration) -> Result<(), BuildError> {
        match declaration {
            Declaration::Http {
                method,
                path,
                has_body,
            } => self.parse_http_method_and_path(*method, path, *has_body),
            Declaration::Headers(lines) => {
                if lines.is_empty() {
                    return Err(self.error(BuildErrorKind::MalformedDeclaration(
                        "@Headers declaration is empty".to_string(),
                    )));
                }
                for line in lines {
                    self.parse_header_line(line)?;
                }
                Ok(())
            }
            Declaration::Encoding(encoding) => {
                if self.is_form_encoded || self.is_multipart {
                    return Err(self.error(BuildErrorKind::ConflictingEncoding));
                }
                match encoding {
                    Encoding::FormUrlEncoded => self.is_form_encoded = true,
                    Encoding::Multipart => self.is_multipart = true,
                }
                Ok(())
            }
            Declaration::Param(kind) => Err(self.error(BuildErrorKind::MalformedDeclaration(
                format!("{kind} is a parameter declaration"),
            ))),
            Declaration::Tag(_) => Ok(()),
        }
    }

    fn parse_http_method_and_path(
        &mut self,
        method: Method,
        path: &str,
        has_body: bool,
    ) -> Result<(), BuildError> {
        if let Some(first) = self.method {
            return Err(self.error(BuildErrorKind::DuplicateHttpMethod {
                first: first.to_string(),
                second: method.to_string(),
            }));
        }
        self.method = Some(method);
        self.has_body = has_body;

        if path.is_empty() {
            return Ok(());
        }

        let template = PathTemplate::new(path);
        if template.query_has_placeholders() {
            let query = template.query().unwrap_or_default().to_string();
            return Err(self.error(BuildErrorKind::QueryPlaceholderInPath(query)));
        }
        self.path_param_names = template.placeholders();
        self.relative_url = Some(template);
        Ok(())
    }

    fn parse_header_line(&mut self, line: &str) -> Result<(), BuildError> {
        let colon = line.find(':').filter(|&i| i > 0 && i + 1 < line.len());
        let Some((name, value)) = colon.and_then(|i| {
            let (name, rest) = line.split_at(i);
            rest.get(1..).map(|value| (name.trim(), value.trim()))
        }) else {
            return Err(self.error(BuildErrorKind::MalformedDeclaration(format!(
                "@Headers value must be in the form \"Name: Value\", found: \"{line}\""
            ))));
        };

        if name.eq_ignore_ascii_case("Content-Type") {
            if !is_media_type(value) {
                return Err(self.error(BuildErrorKind::MalformedContentType(value.to_string())));
            }
            self.content_type = Some(value.to_string());
        } else {
            self.headers.push((name.to_string(), value.to_string()));
        }
        Ok(())
    }

    fn parse_parameter(&mut self, parameter: &Parameter) -> Result<ParameterHandler, BuildErrorKind> {
        let mut kinds = parameter.declarations.iter().filter_map(Declaration::as_param);
        let Some(kind) = kinds.next() else {
            return Err(BuildErrorKind::NoParameterAnnotation);
        };
        if kinds.next().is_some() {
            return Err(BuildErrorKind::MultipleAnnotationsOnParameter);
        }
        if parameter.ty.has_unresolvable() {
            return Err(BuildErrorKind::UnresolvableType(parameter.ty.to_string()));
        }

        let ty = &parameter.ty;
        let declarations = parameter.declarations.as_slice();
        match kind {
            ParamKind::Url => self.parse_url(ty),
            ParamKind::Path { name, encoded } => {
                self.check_path(name)?;
                let converter = self.converters.string_converter(ty, declarations)?;
                Ok(ParameterHandler::Path {
                    name: name.clone(),
                    encoded: *encoded,
                    converter,
                })
            }
            ParamKind::Query { name, encoded } => {
                self.got_query = true;
                self.lifted(ty, |element| {
                    let converter = self.converters.string_converter(element, declarations)?;
                    Ok(ParameterHandler::Query {
                        name: name.clone(),
                        encoded: *encoded,
                        converter,
                    })
                })
            }
            ParamKind::QueryName { encoded } => {
                self.got_query_name = true;
                self.lifted(ty, |element| {
                    let converter = self.converters.string_converter(element, declarations)?;
                    Ok(ParameterHandler::QueryName {
                        encoded: *encoded,
                        converter,
                    })
                })
            }
            ParamKind::QueryMap { encoded } => {
                self.got_query_map = true;
                let value_ty = map_value_type(ty, "@QueryMap")?;
                let converter = self.converters.string_converter(value_ty, declarations)?;
                Ok(ParameterHandler::QueryMap {
                    encoded: *encoded,
                    converter,
                })
            }
            ParamKind::Header { name } => self.lifted(ty, |element| {
                let converter = self.converters.string_converter(element, declarations)?;
                Ok(ParameterHandler::Header {
                    name: name.clone(),
                    converter,
                })
            }),
            ParamKind::HeaderMap => {
                let value_ty = map_value_type(ty, "@HeaderMap")?;
                let converter = self.converters.string_converter(value_ty, declarations)?;
                Ok(ParameterHandler::HeaderMap { converter })
            }
            ParamKind::Field { name, encoded } => {
                if !self.is_form_encoded {
                    return Err(BuildErrorKind::FieldRequiresFormEncoding("@Field"));
                }
                self.got_field = true;
                self.lifted(ty, |element| {
                    let converter = self.converters.string_converter(element, declarations)?;
                    Ok(ParameterHandler::Field {
                        name: name.clone(),
                        encoded: *encoded,
                        converter,
                    })
                })
            }
            ParamKind::FieldMap { encoded } => {
                if !self.is_form_encoded {
                    return Err(BuildErrorKind::FieldRequiresFormEncoding("@FieldMap"));
                }
                let value_ty = map_value_type(ty, "@FieldMap")?;
                let converter = self.converters.string_converter(value_ty, declarations)?;
                self.got_field = true;
                Ok(ParameterHandler::FieldMap {
                    encoded: *encoded,
                    converter,
                })
            }
            ParamKind::Part { name, encoding } => {
                if !self.is_multipart {
                    return Err(BuildErrorKind::PartRequiresMultipart("@Part"));
                }
                self.got_part = true;
                let is_raw_part = element_type(ty).is_named(types::PART);
                match name {
                    None if is_raw_part => self.lifted(ty, |_| Ok(ParameterHandler::RawPart)),
                    None => Err(BuildErrorKind::PartNameRequired),
                    Some(_) if is_raw_part => Err(BuildErrorKind::RawPartWithName),
                    Some(name) => self.lifted(ty, |element| {
                        let converter = self.converters.request_body_converter(
                            element,
                            declarations,
                            self.descriptor.declarations(),
                        )?;
                        Ok(ParameterHandler::Part {
                            name: name.clone(),
                            transfer_encoding: encoding.clone(),
                            converter,
                        })
                    }),
                }
            }
            ParamKind::PartMap { encoding } => {
                if !self.is_multipart {
                    return Err(BuildErrorKind::PartRequiresMultipart("@PartMap"));
                }
                self.got_part = true;
                let value_ty = map_value_type(ty, "@PartMap")?;
                if value_ty.is_named(types::PART) {
                    return Err(BuildErrorKind::PartMapRawPartValue);
                }
                let converter = self.converters.request_body_converter(
                    value_ty,
                    declarations,
                    self.descriptor.declarations(),
                )?;
                Ok(ParameterHandler::PartMap {
                    transfer_encoding: encoding.clone(),
                    converter,
                })
            }
            ParamKind::Body => {
                if self.is_form_encoded || self.is_multipart {
                    return Err(BuildErrorKind::BodyWithEncoding);
                }
                if self.got_body {
                    return Err(BuildErrorKind::MultipleBody);
                }
                let converter = self.converters.request_body_converter(
                    ty,
                    declarations,
                    self.descriptor.declarations(),
                )?;
                self.got_body = true;
                Ok(ParameterHandler::Body { converter })
            }
        }
    }

    fn parse_url(&mut self, ty: &TypeDesc) -> Result<ParameterHandler, BuildErrorKind> {
        if self.got_url {
            return Err(BuildErrorKind::MultipleUrl);
        }
        if self.got_path {
            return Err(BuildErrorKind::PathWithUrl);
        }
        if self.got_query {
            return Err(BuildErrorKind::UrlAfter("@Query"));
        }
        if self.got_query_name {
            return Err(BuildErrorKind::UrlAfter("@QueryName"));
        }
        if self.got_query_map {
            return Err(BuildErrorKind::UrlAfter("@QueryMap"));
        }
        if self.relative_url.is_some() {
            return Err(BuildErrorKind::UrlWithMethodPath);
        }
        if ![types::URL, types::STRING, types::URI]
            .iter()
            .any(|name| ty.is_named(name))
        {
            return Err(BuildErrorKind::InvalidUrlType);
        }
        self.got_url = true;
        Ok(ParameterHandler::RelativeUrl)
    }

    fn check_path(&mut self, name: &str) -> Result<(), BuildErrorKind> {
        if self.got_query {
            return Err(BuildErrorKind::PathAfter("@Query"));
        }
        if self.got_query_name {
            return Err(BuildErrorKind::PathAfter("@QueryName"));
        }
        if self.got_query_map {
            return Err(BuildErrorKind::PathAfter("@QueryMap"));
        }
        if self.got_url {
            return Err(BuildErrorKind::PathWithUrl);
        }
        let Some(relative_url) = self.relative_url.as_ref().map(|url| url.as_str().to_string())
        else {
            return Err(BuildErrorKind::PathWithoutMethodPath);
        };
        self.got_path = true;

        if !PathTemplate::is_valid_name(name) {
            return Err(BuildErrorKind::InvalidPathName(name.to_string()));
        }
        if !self.path_param_names.iter().any(|n| n == name) {
            return Err(BuildErrorKind::UnknownPathPlaceholder {
                path: relative_url,
                name: name.to_string(),
            });
        }
        self.bound_paths.push(name.to_string());
        Ok(())
    }

    /// Build the scalar handler for the element type, lifted for sequences and arrays.
    fn lifted(
        &self,
        ty: &TypeDesc,
        scalar: impl FnOnce(&TypeDesc) -> Result<ParameterHandler, BuildErrorKind>,
    ) -> Result<ParameterHandler, BuildErrorKind> {
        match ty {
            TypeDesc::Seq(element) => scalar(element).map(ParameterHandler::sequence),
            TypeDesc::Array(element) => scalar(element).map(ParameterHandler::fixed_array),
            other => scalar(other),
        }
    }
}

/// Element type for sequences and arrays, the type itself otherwise.
fn element_type(ty: &TypeDesc) -> &TypeDesc {
    ty.element().unwrap_or(ty)
}

/// Value type of a `String`-keyed map.
fn map_value_type<'t>(ty: &'t TypeDesc, label: &'static str) -> Result<&'t TypeDesc, BuildErrorKind> {
    let (key, value) = ty
        .map_types()
        .ok_or(BuildErrorKind::MapTypeRequired(label))?;
    if !key.is_named(types::STRING) {
        return Err(BuildErrorKind::MapKeyNotString(label, key.to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    fn build(descriptor: &MethodDescriptor) -> Result<RequestTemplate, BuildError> {
        RequestTemplate::build(descriptor, &ConverterResolver::default())
    }

    #[test]
    fn static_parts_are_captured() {
        let descriptor = MethodDescriptor::new("upload")
            .declare(Declaration::tag("audit"))
            .declare(Declaration::put("files/{id}"))
            .declare(Declaration::headers([
                "Accept: */*",
                "content-type: text/plain; charset=utf-8",
                "X-Trace: a:b",
            ]))
            .param(TypeDesc::string(), [Declaration::path("id")])
            .param(TypeDesc::string(), [Declaration::body()]);

        let template = build(&descriptor).expect("template");

        check!(template.method_name() == "upload");
        check!(template.method() == Method::Put);
        check!(template.relative_url() == Some("files/{id}"));
        check!(template.path_param_names() == ["id"]);
        check!(
            template.headers()
                == [
                    ("Accept".to_string(), "*/*".to_string()),
                    ("X-Trace".to_string(), "a:b".to_string()),
                ]
        );
        check!(template.content_type() == Some("text/plain; charset=utf-8"));
        check!(template.has_body());
        check!(!template.is_form_encoded());
        check!(!template.is_multipart());
        check!(template.handlers().len() == 2);
    }

    #[test]
    fn sequences_and_arrays_are_lifted() {
        let descriptor = MethodDescriptor::new("list")
            .declare(Declaration::get("items"))
            .param(TypeDesc::seq(TypeDesc::string()), [Declaration::query("tag")])
            .param(TypeDesc::array(TypeDesc::string()), [Declaration::header("X-Id")])
            .param(TypeDesc::string(), [Declaration::query("q")]);

        let template = build(&descriptor).expect("template");
        let_assert!(
            [
                ParameterHandler::Sequence(tag),
                ParameterHandler::FixedArray(id),
                ParameterHandler::Query { .. },
            ] = template.handlers()
        );
        check!(tag.describe() == "@Query(\"tag\")");
        check!(id.describe() == "@Header(\"X-Id\")");
    }

    #[test]
    fn url_parameter_without_method_path() {
        let descriptor = MethodDescriptor::new("follow")
            .declare(Declaration::get(""))
            .param(TypeDesc::url(), [Declaration::url()]);

        let template = build(&descriptor).expect("template");
        check!(template.relative_url().is_none());
        check!(template.path_param_names().is_empty());
    }

    #[test]
    fn first_error_wins() {
        let descriptor = MethodDescriptor::new("broken")
            .declare(Declaration::get("a/{id}"))
            .param(TypeDesc::string(), [Declaration::query("q")])
            .param(TypeDesc::string(), [Declaration::path("id")])
            .param(TypeDesc::string(), [Declaration::body()]);

        let_assert!(Err(err) = build(&descriptor));
        check!(err.kind == BuildErrorKind::PathAfter("@Query"));
        check!(err.parameter.map(|param| param.index) == Some(1));
    }
}
