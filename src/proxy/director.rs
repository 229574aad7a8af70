//! Request director.
//!
//! # Responsibilities
//! - Rewrite scheme, authority and path to the route target
//! - Compose identity headers and route templates into the request
//! - Remove caller credentials before the request leaves the proxy
//!
//! # Design Decisions
//! - Stages run strictly in order: rewrite → compose → sanitize
//! - Route compositions are computed before any is applied; on error the
//!   inbound request is dropped and nothing is forwarded
//! - Sanitizing does not depend on route settings

use axum::body::Body;
use axum::http::{header, uri::PathAndQuery, HeaderValue, Request, Uri, Version};
use std::net::SocketAddr;
use url::{Position, Url};

use crate::compose::{compose_identity_headers, compose_route, template_context, IdentityHeaderSettings};
use crate::identity::CallerIdentity;
use crate::proxy::error::ProxyError;
use crate::proxy::path::join_url_fragments;
use crate::routing::Route;
use crate::security::headers::{append_forwarded_for, strip_credentials, strip_hop_by_hop};

/// Builds outbound requests from inbound ones.
#[derive(Debug, Clone, Default)]
pub struct Director {
    identity: IdentityHeaderSettings,
}

impl Director {
    pub fn new(identity: IdentityHeaderSettings) -> Self {
        Self { identity }
    }

    /// Produce the request to send upstream, or the reason it must not be sent.
    pub fn direct(
        &self,
        request: Request<Body>,
        route: &Route,
        identity: &CallerIdentity,
        remote_addr: Option<SocketAddr>,
    ) -> Result<Request<Body>, ProxyError> {
        let (mut parts, mut body) = request.into_parts();

        // Stage 1: rewrite target.
        let subpath = route.subpath(parts.uri.path());
        let path = join_url_fragments(route.target.path(), subpath);
        let inbound_query = parts.uri.query().map(str::to_owned);

        // Stage 2: compose. Everything fallible happens before the request is touched.
        let context = template_context(route, identity);
        let composition = compose_route(route, inbound_query.as_deref(), &context)?;
        let query = composition.query.or(inbound_query);
        let uri = target_uri(&route.target, &path, query.as_deref())?;
        let host = HeaderValue::from_str(authority(&route.target))
            .map_err(|e| ProxyError::InvalidTarget(e.to_string()))?;

        strip_hop_by_hop(&mut parts.headers);
        compose_identity_headers(
            identity,
            &self.identity,
            route.forward_identity,
            &mut parts.headers,
            remote_addr,
        );
        if let Some(addr) = remote_addr {
            append_forwarded_for(&mut parts.headers, addr);
        }
        for (name, value) in composition.headers {
            if let Some(name) = name {
                parts.headers.insert(name, value);
            }
        }
        if let Some(bytes) = composition.body {
            parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
            body = Body::from(bytes);
        }

        parts.uri = uri;
        parts.version = Version::HTTP_11;
        parts.headers.insert(header::HOST, host);

        // Stage 3: sanitize.
        strip_credentials(&mut parts.headers);

        Ok(Request::from_parts(parts, body))
    }
}

fn authority(target: &Url) -> &str {
    &target[Position::BeforeHost..Position::AfterPort]
}

fn target_uri(target: &Url, path: &str, query: Option<&str>) -> Result<Uri, ProxyError> {
    let path_and_query = match query {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path.to_string(),
    };
    let path_and_query =
        PathAndQuery::try_from(path_and_query).map_err(|e| ProxyError::InvalidTarget(e.to_string()))?;

    Uri::builder()
        .scheme(target.scheme())
        .authority(authority(target))
        .path_and_query(path_and_query)
        .build()
        .map_err(|e| ProxyError::InvalidTarget(e.to_string()))
}
