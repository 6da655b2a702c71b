//! Multipart form data support.
//!
//! `@Part` parameters become [`Part`]s of a [`Form`]; a prepared `Part` can
//! also be passed directly as the argument of an unnamed `@Part` parameter.
//!
//! # Example
//!
//! ```
//! use plier_core::{Form, Part};
//!
//! let form = Form::with_boundary("b")
//!     .part(Part::text("name", "John Doe"))
//!     .part(Part::file("avatar", "photo.jpg", vec![0xFF, 0xD8]));
//!
//! let (content_type, _body) = form.into_body();
//! assert_eq!(content_type, "multipart/form-data; boundary=b");
//! ```

use bytes::{BufMut, Bytes, BytesMut};

/// A single part in a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    transfer_encoding: Option<String>,
    data: Bytes,
}

impl Part {
    /// Create a new part with the given name and data.
    #[must_use]
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            transfer_encoding: None,
            data: data.into(),
        }
    }

    /// Create a text part (`text/plain; charset=utf-8`).
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value.into()).with_content_type("text/plain; charset=utf-8")
    }

    /// Create a binary part (`application/octet-stream`).
    #[must_use]
    pub fn bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::new(name, data).with_content_type("application/octet-stream")
    }

    /// Create a file part.
    ///
    /// The content type is guessed from the filename extension.
    #[must_use]
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename);
        Self::new(name, data)
            .with_filename(filename)
            .with_content_type(content_type)
    }

    /// Set the filename for this part.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the content type for this part.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the `Content-Transfer-Encoding` for this part.
    #[must_use]
    pub fn with_transfer_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.transfer_encoding = Some(encoding.into());
        self
    }

    /// Get the part name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the filename, if set.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Get the content type, if set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Get the transfer encoding, if set.
    #[must_use]
    pub fn transfer_encoding(&self) -> Option<&str> {
        self.transfer_encoding.as_deref()
    }

    /// Get the part data.
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }
}

fn guess_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        _ => "application/octet-stream",
    }
}

/// A multipart form containing multiple parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    parts: Vec<Part>,
    boundary: String,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create a new empty form with a generated boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Create a new form with a fixed boundary.
    ///
    /// The boundary must not appear in any part data.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            parts: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Add a part to the form.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Append a part in place.
    pub fn push(&mut self, part: Part) {
        self.parts.push(part);
    }

    /// Add a text field to the form.
    #[must_use]
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(Part::text(name, value))
    }

    /// Get the boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Get the parts in this form.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Returns `true` if the form has no part.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// `multipart/form-data; boundary=<boundary>`.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Convert the form into (content-type header value, body bytes).
    #[must_use]
    pub fn into_body(self) -> (String, Bytes) {
        let content_type = self.content_type();
        let body = self.encode();
        (content_type, body)
    }

    fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\n");

            buf.put_slice(b"Content-Disposition: form-data; name=\"");
            buf.put_slice(part.name.as_bytes());
            buf.put_slice(b"\"");
            if let Some(filename) = &part.filename {
                buf.put_slice(b"; filename=\"");
                buf.put_slice(filename.as_bytes());
                buf.put_slice(b"\"");
            }
            buf.put_slice(b"\r\n");

            if let Some(encoding) = &part.transfer_encoding {
                buf.put_slice(b"Content-Transfer-Encoding: ");
                buf.put_slice(encoding.as_bytes());
                buf.put_slice(b"\r\n");
            }

            if let Some(content_type) = &part.content_type {
                buf.put_slice(b"Content-Type: ");
                buf.put_slice(content_type.as_bytes());
                buf.put_slice(b"\r\n");
            }
            buf.put_slice(format!("Content-Length: {}\r\n", part.data.len()).as_bytes());

            buf.put_slice(b"\r\n");
            buf.put_slice(&part.data);
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        buf.freeze()
    }
}

fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    format!("----PlierBoundary{timestamp:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_text() {
        let part = Part::text("field", "value");
        assert_eq!(part.name(), "field");
        assert_eq!(part.data().as_ref(), b"value");
        assert_eq!(part.content_type(), Some("text/plain; charset=utf-8"));
        assert!(part.filename().is_none());
        assert!(part.transfer_encoding().is_none());
    }

    #[test]
    fn part_file_guesses_content_type() {
        let part = Part::file("upload", "photo.JPG", vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(part.filename(), Some("photo.JPG"));
        assert_eq!(part.content_type(), Some("image/jpeg"));

        let part = Part::file("upload", "noext", vec![]);
        assert_eq!(part.content_type(), Some("application/octet-stream"));
    }

    #[test]
    fn form_generated_boundary() {
        let form = Form::new();
        assert!(form.is_empty());
        assert!(form.boundary().starts_with("----PlierBoundary"));
    }

    #[test]
    fn form_encode() {
        let form = Form::with_boundary("boundary123")
            .part(Part::text("field", "value").with_transfer_encoding("binary"));

        let (content_type, body) = form.into_body();
        assert_eq!(content_type, "multipart/form-data; boundary=boundary123");

        let body = String::from_utf8_lossy(&body);
        assert_eq!(
            body,
            "--boundary123\r\n\
             Content-Disposition: form-data; name=\"field\"\r\n\
             Content-Transfer-Encoding: binary\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             Content-Length: 5\r\n\
             \r\n\
             value\r\n\
             --boundary123--\r\n"
        );
    }

    #[test]
    fn form_encode_with_file() {
        let form = Form::with_boundary("b").part(Part::file("upload", "test.txt", "content"));
        let (_, body) = form.into_body();
        let body = String::from_utf8_lossy(&body);

        assert!(body.contains("name=\"upload\"; filename=\"test.txt\""));
        assert!(body.contains("Content-Type: text/plain\r\n"));
    }
}
