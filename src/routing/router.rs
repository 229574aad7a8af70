//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for request
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in priority order (acceptable for typical route counts)
//! - Ties broken by longer path prefix, then declaration order
//! - Explicit NoMatch rather than silent default

use axum::body::Body;
use axum::http::Request;
use std::sync::Arc;

use crate::config::schema::ProxyConfig;
use crate::routing::route::{parse_target, Route, RouteError};

/// Compiled, ordered route table.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Arc<Route>>,
}

impl Router {
    /// Compile all routes of `config`.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, RouteError> {
        let default_target = parse_target(&config.upstream.default_url).ok();

        let mut routes = config
            .routes
            .iter()
            .map(|r| Route::compile(r, default_target.as_ref()).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        // Stable sort keeps declaration order for equal keys.
        routes.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.path_prefix.len().cmp(&a.path_prefix.len()))
        });

        tracing::debug!(routes = routes.len(), "Route table compiled");
        Ok(Self { routes })
    }

    /// Find the first route matching the request.
    pub fn match_request(&self, req: &Request<Body>) -> Option<Arc<Route>> {
        self.routes.iter().find(|r| r.matches(req)).cloned()
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;

    fn router(toml: &str) -> Router {
        Router::from_config(&parse_config(toml).unwrap()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).header("Host", "proxy.test").body(Body::empty()).unwrap()
    }

    #[test]
    fn test_longest_prefix_wins_on_equal_priority() {
        let router = router(
            r#"
            [[routes]]
            name = "api"
            path_prefix = "/api"

            [[routes]]
            name = "reports"
            path_prefix = "/api/reports"
            "#,
        );
        assert_eq!(router.match_request(&get("/api/reports/x")).unwrap().name, "reports");
        assert_eq!(router.match_request(&get("/api/users")).unwrap().name, "api");
        assert!(router.match_request(&get("/other")).is_none());
    }

    #[test]
    fn test_priority_beats_prefix_length() {
        let router = router(
            r#"
            [[routes]]
            name = "catch-all"
            path_prefix = "/"
            priority = 10

            [[routes]]
            name = "api"
            path_prefix = "/api"
            "#,
        );
        assert_eq!(router.match_request(&get("/api/x")).unwrap().name, "catch-all");
    }

    #[test]
    fn test_host_condition() {
        let router = router(
            r#"
            [[routes]]
            name = "tenant"
            path_prefix = "/"
            host = "tenant.test"
            "#,
        );
        assert!(router.match_request(&get("/x")).is_none());

        let req = Request::builder().uri("/x").header("Host", "tenant.test").body(Body::empty()).unwrap();
        assert!(router.match_request(&req).is_some());
    }
}
