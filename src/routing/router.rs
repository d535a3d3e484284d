//! Mount lookup.
//!
//! # Responsibilities
//! - Store mounts in registration order
//! - Look up the mount owning a request path
//! - Return matched mount or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) prefix scan (acceptable for a handful of mounts)
//! - Longest prefix wins; equal prefixes resolve to the first registered

use crate::routing::matcher::PathPrefixMatcher;

/// A successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'r, 'p, T> {
    pub prefix: &'r str,
    pub value: &'r T,
    /// Path below the prefix, still percent-encoded.
    pub rest: &'p str,
}

/// Longest-prefix router over values of type `T`.
#[derive(Debug)]
pub struct PrefixRouter<T> {
    routes: Vec<(PathPrefixMatcher, T)>,
}

impl<T> Default for PrefixRouter<T> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<T> PrefixRouter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` under `prefix`.
    pub fn insert(&mut self, prefix: impl Into<String>, value: T) {
        self.routes.push((PathPrefixMatcher::new(prefix), value));
    }

    /// Find the most specific route for `path`.
    pub fn route<'r, 'p>(&'r self, path: &'p str) -> Option<RouteMatch<'r, 'p, T>> {
        let mut best: Option<RouteMatch<'r, 'p, T>> = None;

        for (matcher, value) in &self.routes {
            let Some(rest) = matcher.match_path(path) else {
                continue;
            };
            let better = match &best {
                None => true,
                // Strictly longer only: ties keep the earlier registration.
                Some(current) => matcher.specificity() > current.prefix.len(),
            };
            if better {
                best = Some(RouteMatch {
                    prefix: matcher.prefix(),
                    value,
                    rest,
                });
            }
        }

        best
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered prefixes in order.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|(m, _)| m.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> PrefixRouter<&'static str> {
        let mut router = PrefixRouter::new();
        router.insert("/", "public");
        router.insert("/uv/", "uv");
        router.insert("/uv/sw/", "sw");
        router.insert("/epoxy/", "epoxy");
        router
    }

    #[test]
    fn test_longest_prefix_wins() {
        let router = router();

        let m = router.route("/uv/sw/sw.js").unwrap();
        assert_eq!(*m.value, "sw");
        assert_eq!(m.rest, "sw.js");

        let m = router.route("/uv/uv.bundle.js").unwrap();
        assert_eq!(*m.value, "uv");

        let m = router.route("/epoxy").unwrap();
        assert_eq!(*m.value, "epoxy");
        assert_eq!(m.rest, "");

        let m = router.route("/index.html").unwrap();
        assert_eq!(*m.value, "public");
        assert_eq!(m.prefix, "/");
    }

    #[test]
    fn test_tie_prefers_first_registered() {
        let mut router = PrefixRouter::new();
        router.insert("/assets/", 1);
        router.insert("/assets", 2);

        assert_eq!(*router.route("/assets/app.js").unwrap().value, 1);
    }

    #[test]
    fn test_no_match() {
        let mut router = PrefixRouter::new();
        router.insert("/uv/", ());
        assert!(router.route("/").is_none());
        assert!(router.route("/baremux/index.js").is_none());
        assert_eq!(router.len(), 1);
    }
}
