//! Route matching logic.
//!
//! # Responsibilities
//! - Match the request host (case-insensitive, port ignored)
//! - Match the path prefix on segment boundaries and split off the subpath
//!
//! # Design Decisions
//! - `/api` matches `/api` and `/api/x` but not `/apix`
//! - Path matching is case-sensitive
//! - No regex: matching is a single prefix comparison

use axum::body::Body;
use axum::http::{header, Request};

/// A condition a request must satisfy to select a route.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    fn matches(&self, req: &Request<Body>) -> bool;
}

/// Matches the `Host` header, falling back to the URI authority.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        let host = req
            .headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| req.uri().host());

        host.is_some_and(|h| without_port(h).eq_ignore_ascii_case(&self.expected_host))
    }
}

/// Matches a path prefix on `/` boundaries.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// The remainder of `path` after the prefix, without its leading `/`.
    ///
    /// `None` when the prefix does not match.
    pub fn strip<'p>(&self, path: &'p str) -> Option<&'p str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with('/') || self.prefix.ends_with('/') {
            Some(rest.trim_start_matches('/'))
        } else {
            None
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        self.strip(req.uri().path()).is_some()
    }
}

fn without_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, host: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(host) = host {
            builder = builder.header(header::HOST, host);
        }
        builder.body(Body::default()).unwrap()
    }

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new("Example.com");

        assert!(matcher.matches(&request("/", Some("example.com"))));
        assert!(matcher.matches(&request("/", Some("EXAMPLE.COM:8443"))));
        assert!(matcher.matches(&request("http://example.com/x", None)));
        assert!(!matcher.matches(&request("/", Some("other.com"))));
        assert!(!matcher.matches(&request("/", None)));
    }

    #[test]
    fn test_path_matcher_segments() {
        let matcher = PathPrefixMatcher::new("/api");

        assert!(matcher.matches(&request("/api", None)));
        assert!(matcher.matches(&request("/api/v1", None)));
        assert!(matcher.matches(&request("/api?x=1", None)));
        assert!(!matcher.matches(&request("/apix", None)));
        assert!(!matcher.matches(&request("/images", None)));
        assert!(!matcher.matches(&request("/API/v1", None)));
    }

    #[test]
    fn test_strip() {
        let matcher = PathPrefixMatcher::new("/api/reports");
        assert_eq!(matcher.strip("/api/reports"), Some(""));
        assert_eq!(matcher.strip("/api/reports/"), Some(""));
        assert_eq!(matcher.strip("/api/reports/daily/1"), Some("daily/1"));
        assert_eq!(matcher.strip("/api/reportsx"), None);

        let root = PathPrefixMatcher::new("/");
        assert_eq!(root.strip("/anything/else"), Some("anything/else"));
    }
}
