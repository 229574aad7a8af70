//! Outbound request composition.
//!
//! # Data Flow
//! ```text
//! CallerIdentity + Route
//!     → template_context() (JsonData, SecureJsonData, User)
//!     → headers.rs (identity headers, route header templates)
//!     → query.rs (url param templates, accumulated)
//!     → body.rs (body template, replaces inbound body)
//!     → Composition (applied by the director only when complete)
//! ```
//!
//! # Design Decisions
//! - Route compositions are computed in full before anything touches the
//!   outbound request; a single failure discards everything
//! - The identity-header composer is shared by every forwarding path

pub mod body;
pub mod headers;
pub mod query;

use axum::http::HeaderMap;
use bytes::Bytes;
use thiserror::Error;

use crate::identity::CallerIdentity;
use crate::routing::Route;
use crate::template::{TemplateContext, TemplateError};

pub use body::compose_body;
pub use headers::{compose_identity_headers, compose_route_headers, IdentityHeaderSettings};
pub use query::compose_query;

/// Failure to build part of the outbound request from route templates.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("header #{index}: {source}")]
    Header {
        index: usize,
        #[source]
        source: TemplateError,
    },

    #[error("header #{index}: resolved name is not a valid header name")]
    InvalidHeaderName { index: usize },

    #[error("header #{index}: resolved value is not a valid header value")]
    InvalidHeaderValue { index: usize },

    #[error("url param #{index}: {source}")]
    Query {
        index: usize,
        #[source]
        source: TemplateError,
    },

    #[error("body: {0}")]
    Body(#[source] TemplateError),
}

impl ComposeError {
    /// Which part of the request failed, for logs and metrics labels.
    pub fn stage(&self) -> &'static str {
        match self {
            ComposeError::Header { .. }
            | ComposeError::InvalidHeaderName { .. }
            | ComposeError::InvalidHeaderValue { .. } => "headers",
            ComposeError::Query { .. } => "query",
            ComposeError::Body(_) => "body",
        }
    }
}

/// Everything a route contributes to the outbound request.
#[derive(Debug, Default)]
pub struct Composition {
    pub headers: HeaderMap,
    /// Replacement query string; `None` keeps the inbound query.
    pub query: Option<String>,
    /// Replacement body; `None` passes the inbound body through.
    pub body: Option<Bytes>,
}

/// Build the data exposed to a route's templates.
pub fn template_context(route: &Route, identity: &CallerIdentity) -> TemplateContext {
    TemplateContext::new()
        .with_field("JsonData", route.json_data.clone())
        .with_field("SecureJsonData", route.secure_json_data.clone())
        .with_serialized("User", identity)
}

/// Run every route composer; nothing is returned unless all succeed.
pub fn compose_route(
    route: &Route,
    base_query: Option<&str>,
    context: &TemplateContext,
) -> Result<Composition, ComposeError> {
    let headers = compose_route_headers(route, context)?;
    let query = if route.url_params.is_empty() {
        None
    } else {
        Some(compose_query(base_query, route, context)?)
    };
    let body = compose_body(route, context)?;

    Ok(Composition { headers, query, body })
}
