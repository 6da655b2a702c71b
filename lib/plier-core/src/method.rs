//! HTTP verbs.

use derive_more::Display;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Method {
    /// `GET`
    #[display("GET")]
    Get,
    /// `POST`
    #[display("POST")]
    Post,
    /// `PUT`
    #[display("PUT")]
    Put,
    /// `DELETE`
    #[display("DELETE")]
    Delete,
    /// `PATCH`
    #[display("PATCH")]
    Patch,
    /// `HEAD`
    #[display("HEAD")]
    Head,
    /// `OPTIONS`
    #[display("OPTIONS")]
    Options,
}

impl Method {
    /// Whether the shorthand declarations (`Declaration::post`, ...) give
    /// this verb a request body. `Declaration::http` sets it explicitly.
    #[must_use]
    pub const fn has_body_by_default(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Delete => Self::DELETE,
            Method::Patch => Self::PATCH,
            Method::Head => Self::HEAD,
            Method::Options => Self::OPTIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_wire_verb() {
        assert_eq!(Method::Delete.to_string(), "DELETE");
        assert_eq!(http::Method::from(Method::Options), http::Method::OPTIONS);
    }

    #[test]
    fn only_post_put_patch_have_a_body_by_default() {
        let with_body: Vec<_> = [
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Delete,
            Method::Patch,
            Method::Head,
            Method::Options,
        ]
        .into_iter()
        .filter(Method::has_body_by_default)
        .collect();
        assert_eq!(with_body, [Method::Post, Method::Put, Method::Patch]);
    }
}
