//! URL path joining.

/// Join a base path and a subpath with exactly one `/` between them.
///
/// An empty subpath leaves the base untouched; an empty result is `/`.
pub fn join_url_fragments(base: &str, subpath: &str) -> String {
    if subpath.is_empty() {
        return if base.is_empty() { "/".to_string() } else { base.to_string() };
    }

    match (base.ends_with('/'), subpath.starts_with('/')) {
        (true, true) => format!("{base}{}", &subpath[1..]),
        (false, false) => format!("{base}/{subpath}"),
        _ => format!("{base}{subpath}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_subpath() {
        assert_eq!(join_url_fragments("/api", ""), "/api");
        assert_eq!(join_url_fragments("/api/", ""), "/api/");
        assert_eq!(join_url_fragments("", ""), "/");
    }

    #[test]
    fn test_separator_handling() {
        assert_eq!(join_url_fragments("/api/", "foo"), "/api/foo");
        assert_eq!(join_url_fragments("/api", "foo"), "/api/foo");
        assert_eq!(join_url_fragments("/api/", "/foo"), "/api/foo");
        assert_eq!(join_url_fragments("/api", "/foo"), "/api/foo");
        assert_eq!(join_url_fragments("/", "foo/bar"), "/foo/bar");
        assert_eq!(join_url_fragments("", "foo"), "/foo");
    }
}
