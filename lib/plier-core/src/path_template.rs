//! Relative URL templates with `{name}` placeholders.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{([a-zA-Z][a-zA-Z0-9_-]*)\}").ok());

static PARAM_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").ok());

/// A relative URL template such as `users/{id}/posts?sort=desc`.
///
/// # Example
///
/// ```
/// use plier_core::PathTemplate;
///
/// let template = PathTemplate::new("a/{id}/b/{id}/c/{name}");
/// assert_eq!(template.placeholders(), ["id", "name"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathTemplate(String);

impl PathTemplate {
    /// Create a new path template.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Get the template string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path portion, before any `?`.
    #[must_use]
    pub fn path(&self) -> &str {
        self.0.split_once('?').map_or(self.0.as_str(), |(path, _)| path)
    }

    /// Static query portion, after the first `?`.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.0.split_once('?').map(|(_, query)| query)
    }

    /// Returns `true` if the static query portion contains placeholders.
    #[must_use]
    pub fn query_has_placeholders(&self) -> bool {
        self.query()
            .is_some_and(|query| PLACEHOLDER.as_ref().is_some_and(|re| re.is_match(query)))
    }

    /// Placeholder names of the path portion, deduplicated, in first-seen order.
    #[must_use]
    pub fn placeholders(&self) -> Vec<String> {
        let Some(re) = PLACEHOLDER.as_ref() else {
            return Vec::new();
        };
        let mut names: Vec<String> = Vec::new();
        for captures in re.captures_iter(self.path()) {
            if let Some(name) = captures.get(1)
                && !names.iter().any(|n| n == name.as_str())
            {
                names.push(name.as_str().to_string());
            }
        }
        names
    }

    /// Returns `true` if `name` is a syntactically valid placeholder name.
    #[must_use]
    pub fn is_valid_name(name: &str) -> bool {
        PARAM_NAME.as_ref().is_some_and(|re| re.is_match(name))
    }

    /// Replace every `{name}` occurrence with its (already encoded) value.
    ///
    /// Placeholders without a substitution are left untouched.
    #[must_use]
    pub fn expand<'a>(&self, substitutions: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
        let mut expanded = self.0.clone();
        for (name, value) in substitutions {
            expanded = expanded.replace(&format!("{{{name}}}"), value);
        }
        expanded
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PathTemplate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_ordered_and_deduplicated() {
        let template = PathTemplate::new("a/{id}/b/{id}/c/{name}");
        assert_eq!(template.placeholders(), vec!["id", "name"]);
    }

    #[test]
    fn placeholders_ignore_invalid_names() {
        let template = PathTemplate::new("x/{1abc}/{ok_1-2}/{}");
        assert_eq!(template.placeholders(), vec!["ok_1-2"]);
    }

    #[test]
    fn query_split() {
        let template = PathTemplate::new("users/{id}?sort=desc");
        assert_eq!(template.path(), "users/{id}");
        assert_eq!(template.query(), Some("sort=desc"));
        assert!(!template.query_has_placeholders());

        let template = PathTemplate::new("users?id={id}");
        assert!(template.query_has_placeholders());
        assert!(template.placeholders().is_empty());
    }

    #[test]
    fn valid_names() {
        assert!(PathTemplate::is_valid_name("id"));
        assert!(PathTemplate::is_valid_name("user-id_2"));
        assert!(!PathTemplate::is_valid_name("2id"));
        assert!(!PathTemplate::is_valid_name("id}"));
        assert!(!PathTemplate::is_valid_name(""));
    }

    #[test]
    fn expand_replaces_every_occurrence() {
        let template = PathTemplate::new("a/{id}/b/{id}");
        assert_eq!(template.expand([("id", "42")]), "a/42/b/42");
    }
}
