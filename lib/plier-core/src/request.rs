//! HTTP request building.
//!
//! Requests are normally produced by the request assembler; use
//! [`Request::builder`] to construct one by hand (tests, custom transports).
//!
//! # Example
//!
//! ```
//! use plier_core::{Request, Method};
//!
//! let url = url::Url::parse("https://api.example.com/users").expect("url");
//! let request: Request = Request::builder(Method::Get, url)
//!     .header("Accept", "application/json")
//!     .build();
//! assert_eq!(request.header("accept"), Some("application/json"));
//! ```

use bytes::Bytes;

use crate::Method;

/// An HTTP request with method, URL, ordered headers, and optional body.
///
/// Headers keep insertion order; repeated names are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: Vec<(String, String)>,
    body: Option<B>,
}

impl<B> Request<B> {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestBuilder<B> {
        RequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub const fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers, in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header value with this name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every header value with this name (case-insensitive).
    pub fn header_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, Vec<(String, String)>, Option<B>) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: Vec<(String, String)>,
    body: Option<B>,
}

impl<B> RequestBuilder<B> {
    /// Creates a new builder.
    #[must_use]
    pub const fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Appends multiple headers.
    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: B) -> Self {
        self.body = Some(body);
        self
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request<B> {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_basic() {
        let url = url::Url::parse("https://api.example.com/users").expect("valid URL");
        let request = Request::<Bytes>::builder(Method::Get, url)
            .header("Accept", "application/json")
            .build();

        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.url().as_str(), "https://api.example.com/users");
        assert_eq!(request.header("ACCEPT"), Some("application/json"));
        assert!(request.body().is_none());
    }

    #[test]
    fn request_keeps_repeated_headers_in_order() {
        let url = url::Url::parse("https://api.example.com").expect("valid URL");
        let request = Request::<Bytes>::builder(Method::Get, url)
            .header("X-Tag", "a")
            .headers([("Accept".to_string(), "*/*".to_string())])
            .header("x-tag", "b")
            .build();

        assert_eq!(request.header_all("X-Tag").collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(request.headers().len(), 3);
    }

    #[test]
    fn request_builder_with_body() {
        let url = url::Url::parse("https://api.example.com/users").expect("valid URL");
        let body = Bytes::from(r#"{"name":"test"}"#);
        let request = Request::builder(Method::Post, url).body(body.clone()).build();

        let (method, _, headers, request_body) = request.into_parts();
        assert_eq!(method, Method::Post);
        assert!(headers.is_empty());
        assert_eq!(request_body, Some(body));
    }
}
