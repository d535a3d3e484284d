//! Path matching logic.
//!
//! # Responsibilities
//! - Match mount prefixes against request paths
//! - Match the tunnel endpoint path exactly
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Prefixes match on segment boundaries ("/uv/" never matches "/uvx")
//! - No regex to guarantee O(n) matching

/// Matches a mount prefix and yields the path remainder below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    /// Always ends with '/'.
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    /// A missing trailing slash is added so matches stop at segment boundaries.
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self { prefix }
    }

    /// The normalized prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Length used to rank competing matches.
    pub fn specificity(&self) -> usize {
        self.prefix.len()
    }

    /// Return the remainder of `path` below the prefix.
    ///
    /// The bare prefix without its trailing slash ("/uv" for "/uv/") also
    /// matches, with an empty remainder.
    pub fn match_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        if let Some(rest) = path.strip_prefix(self.prefix.as_str()) {
            return Some(rest);
        }
        if path == &self.prefix[..self.prefix.len() - 1] && !path.is_empty() {
            return Some("");
        }
        None
    }
}

/// Matches one request path exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactPathMatcher {
    path: String,
}

impl ExactPathMatcher {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Compare against a request target, ignoring any query string.
    pub fn matches(&self, target: &str) -> bool {
        let path = target.split(['?', '#']).next().unwrap_or_default();
        path == self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_matcher() {
        let matcher = PathPrefixMatcher::new("/uv/");

        assert_eq!(matcher.match_path("/uv/uv.bundle.js"), Some("uv.bundle.js"));
        assert_eq!(matcher.match_path("/uv/"), Some(""));
        assert_eq!(matcher.match_path("/uv"), Some(""));
        assert_eq!(matcher.match_path("/uvx/file"), None);
        assert_eq!(matcher.match_path("/UV/file"), None);
        assert_eq!(matcher.match_path("/other"), None);
    }

    #[test]
    fn test_prefix_normalized() {
        let matcher = PathPrefixMatcher::new("/epoxy");
        assert_eq!(matcher.prefix(), "/epoxy/");
        assert_eq!(matcher.match_path("/epoxy/index.mjs"), Some("index.mjs"));
    }

    #[test]
    fn test_root_prefix() {
        let matcher = PathPrefixMatcher::new("/");
        assert_eq!(matcher.match_path("/"), Some(""));
        assert_eq!(matcher.match_path("/index.html"), Some("index.html"));
        assert_eq!(matcher.match_path(""), None);
    }

    #[test]
    fn test_exact_matcher() {
        let matcher = ExactPathMatcher::new("/wisp/");
        assert!(matcher.matches("/wisp/"));
        assert!(matcher.matches("/wisp/?token=1"));
        assert!(!matcher.matches("/wisp"));
        assert!(!matcher.matches("/other/"));
        assert!(!matcher.matches("/prefix/wisp/"));
    }
}
