//! Per-invocation request assembly.
//!
//! [`RequestAssembler::apply`] binds the arguments of one call into a
//! [`RequestTemplate`] and produces a transport-ready [`Request`]. Arguments
//! are folded into an [`InProgressRequest`] by the template's parameter
//! handlers, in position order; the request is only built once every handler
//! succeeded.

use bytes::Bytes;
use percent_encoding::{AsciiSet, CONTROLS, NON_ALPHANUMERIC, utf8_percent_encode};
use plier_core::{
    ContentType, Form, Part, PathTemplate, Payload, Request, Value, is_media_type, to_form,
};
use url::Url;

use crate::template::RequestTemplate;
use crate::{Error, Result};

/// Characters encoded in path values.
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'^')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'|')
    .add(b'}')
    .add(b'/')
    .add(b'\\')
    .add(b'%');

/// Characters encoded in already-encoded path values: `/` and `%` are kept.
const ENCODED_PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'^')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'|')
    .add(b'}')
    .add(b'\\');

/// Characters encoded in query names and values.
const QUERY_COMPONENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'&')
    .add(b'\'')
    .add(b'+')
    .add(b'=')
    .add(b'%')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Characters encoded in already-encoded query names and values: only `%`
/// is kept, so a value cannot start another parameter.
const ENCODED_QUERY_COMPONENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'&')
    .add(b'=');

/// Characters encoded in already-encoded form names and values.
const ENCODED_FORM_COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'%')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'*');

/// Mutable accumulator for a single invocation.
///
/// Parameter handlers write into it; [`InProgressRequest::finish`] turns it
/// into an immutable [`Request`].
#[derive(Debug)]
pub struct InProgressRequest {
    method: plier_core::Method,
    base_url: Url,
    relative_url: Option<PathTemplate>,
    query: Vec<String>,
    headers: Vec<(String, String)>,
    content_type: Option<String>,
    has_body: bool,
    form: Option<Vec<Bytes>>,
    multipart: Option<Form>,
    body: Option<Payload>,
}

impl InProgressRequest {
    /// Start a request from a template.
    #[must_use]
    pub fn new(template: &RequestTemplate, base_url: &Url) -> Self {
        Self {
            method: template.method(),
            base_url: base_url.clone(),
            relative_url: template.relative_url().map(PathTemplate::new),
            query: Vec::new(),
            headers: template.headers().to_vec(),
            content_type: template.content_type().map(ToString::to_string),
            has_body: template.has_body(),
            form: template.is_form_encoded().then(Vec::new),
            multipart: template.is_multipart().then(Form::new),
            body: None,
        }
    }

    /// Replace the relative URL (`@Url`).
    pub fn set_relative_url(&mut self, url: impl Into<String>) {
        self.relative_url = Some(PathTemplate::new(url));
    }

    /// Substitute the `{name}` placeholder.
    ///
    /// # Errors
    ///
    /// Returns an error if the value resolves to a `.` or `..` segment.
    pub fn add_path_param(&mut self, name: &str, value: &str, encoded: bool) -> Result<()> {
        let Some(relative_url) = &self.relative_url else {
            return Err(Error::invalid_request(format!(
                "no relative URL to substitute {{{name}}} into"
            )));
        };
        let set = if encoded {
            ENCODED_PATH_SEGMENT_ENCODE_SET
        } else {
            PATH_SEGMENT_ENCODE_SET
        };
        let replacement = utf8_percent_encode(value, set).to_string();
        if has_traversal_segment(&replacement) {
            return Err(Error::invalid_argument(format!(
                "@Path parameters shouldn't perform path traversal ('.' or '..'): {name} is {value}"
            )));
        }
        let expanded = relative_url.expand([(name, replacement.as_str())]);
        self.relative_url = Some(PathTemplate::new(expanded));
        Ok(())
    }

    /// Append a query parameter; `value` is `None` for a value-less name.
    pub fn add_query_param(&mut self, name: &str, value: Option<&str>, encoded: bool) {
        let set = if encoded {
            ENCODED_QUERY_COMPONENT_ENCODE_SET
        } else {
            QUERY_COMPONENT_ENCODE_SET
        };
        let name = utf8_percent_encode(name, set);
        let pair = match value {
            Some(value) => format!("{name}={}", utf8_percent_encode(value, set)),
            None => name.to_string(),
        };
        self.query.push(pair);
    }

    /// Append a header. `Content-Type` sets the request content type instead.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed `Content-Type` value.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<()> {
        if name.eq_ignore_ascii_case("Content-Type") {
            if !is_media_type(value) {
                return Err(Error::invalid_argument(format!(
                    "malformed content type: {value}"
                )));
            }
            self.content_type = Some(value.to_string());
        } else {
            self.headers.push((name.to_string(), value.to_string()));
        }
        Ok(())
    }

    /// Append a form field.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is not form-encoded.
    pub fn add_form_field(&mut self, name: &str, value: &str, encoded: bool) -> Result<()> {
        let Some(form) = &mut self.form else {
            return Err(Error::invalid_request("form field on a non form-encoded request"));
        };
        let field = if encoded {
            let name = utf8_percent_encode(name, ENCODED_FORM_COMPONENT_ENCODE_SET);
            let value = utf8_percent_encode(value, ENCODED_FORM_COMPONENT_ENCODE_SET);
            Bytes::from(format!("{name}={value}"))
        } else {
            to_form(&[(name, value)])?
        };
        form.push(field);
        Ok(())
    }

    /// Append a named part built from a converted payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is not multipart.
    pub fn add_part(&mut self, name: &str, transfer_encoding: &str, payload: Payload) -> Result<()> {
        let (content_type, bytes) = payload.into_parts();
        let mut part = Part::new(name, bytes).with_transfer_encoding(transfer_encoding);
        if let Some(content_type) = content_type {
            part = part.with_content_type(content_type);
        }
        self.add_raw_part(part)
    }

    /// Append a prepared part.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is not multipart.
    pub fn add_raw_part(&mut self, part: Part) -> Result<()> {
        let Some(form) = &mut self.multipart else {
            return Err(Error::invalid_request("part on a non multipart request"));
        };
        form.push(part);
        Ok(())
    }

    /// Set the body.
    pub fn set_body(&mut self, payload: Payload) {
        self.body = Some(payload);
    }

    /// Build the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be resolved or a multipart body has
    /// no part.
    pub fn finish(self) -> Result<Request<Bytes>> {
        let relative = self.relative_url.as_ref().map_or("", PathTemplate::as_str);
        let mut url = self.base_url.join(relative)?;
        if !self.query.is_empty() {
            let dynamic = self.query.join("&");
            let query = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{existing}&{dynamic}"),
                _ => dynamic,
            };
            url.set_query(Some(&query));
        }

        let body = if let Some(fields) = self.form {
            Some(Payload::new(
                ContentType::FormUrlEncoded.as_str(),
                fields.join(&b"&"[..]),
            ))
        } else if let Some(form) = self.multipart {
            if form.is_empty() {
                return Err(Error::invalid_request(
                    "multipart body must have at least one part",
                ));
            }
            let (content_type, bytes) = form.into_body();
            Some(Payload::new(content_type, bytes))
        } else {
            self.body
        };

        let (body_content_type, body) = match body {
            Some(payload) => {
                let (content_type, bytes) = payload.into_parts();
                (content_type, Some(bytes))
            }
            None if self.has_body => (None, Some(Bytes::new())),
            None => (None, None),
        };

        let mut builder = Request::builder(self.method, url).headers(self.headers);
        if let Some(content_type) = self.content_type.or(body_content_type) {
            builder = builder.header("Content-Type", content_type);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        Ok(builder.build())
    }
}

/// Whether an encoded path value contains a segment that resolves to `.` or `..`.
fn has_traversal_segment(value: &str) -> bool {
    value.split('/').any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

/// Binds arguments into a template.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestAssembler;

impl RequestAssembler {
    /// Produce the request for one invocation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArgumentCountMismatch`] if `args` does not have one
    /// value per declared parameter, or the first handler error. No request is
    /// produced on error.
    pub fn apply(template: &RequestTemplate, base_url: &Url, args: Vec<Value>) -> Result<Request<Bytes>> {
        let handlers = template.handlers();
        if args.len() != handlers.len() {
            return Err(Error::ArgumentCountMismatch {
                expected: handlers.len(),
                actual: args.len(),
            });
        }

        let mut request = InProgressRequest::new(template, base_url);
        for (handler, arg) in handlers.iter().zip(args) {
            handler.apply(&mut request, arg)?;
        }
        request.finish()
    }
}
