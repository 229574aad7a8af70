//! Access Control Middleware.
//! Resolves the caller before any routing happens.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;
use crate::identity::Resolution;
use crate::observability::metrics;
use crate::proxy::ProxyError;

pub async fn access_control_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let inner = state.inner.load_full();

    match inner.resolver.resolve(req.headers()) {
        Resolution::Caller(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Resolution::Missing => {
            metrics::record_rejected("none", "auth");
            ProxyError::Unauthorized("missing credentials").into_response()
        }
        Resolution::Invalid => {
            tracing::warn!(path = %req.uri().path(), "Rejected request with unknown credentials");
            metrics::record_rejected("none", "auth");
            ProxyError::Unauthorized("unknown credentials").into_response()
        }
    }
}
