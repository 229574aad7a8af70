//! Proxy call errors and their client-facing responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::compose::ComposeError;

/// Why a proxy call ended without forwarding the upstream response.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no route matches path {0:?}")]
    NoRoute(String),

    #[error("route composition failed: {0}")]
    Compose(#[from] ComposeError),

    #[error("invalid upstream target: {0}")]
    InvalidTarget(String),

    #[error("upstream request failed: {0}")]
    Forwarding(#[source] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0} seconds")]
    Timeout(u64),

    #[error("caller not authenticated: {0}")]
    Unauthorized(&'static str),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoRoute(_) => StatusCode::NOT_FOUND,
            ProxyError::Compose(_) | ProxyError::InvalidTarget(_) | ProxyError::Forwarding(_) => {
                StatusCode::BAD_GATEWAY
            }
            ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

/// The body never carries the error detail; templates and context stay server-side.
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = match self {
            ProxyError::NoRoute(_) => "No matching route found",
            ProxyError::Timeout(_) => "Upstream request timed out",
            ProxyError::Unauthorized(_) => "Unauthorized",
            _ => "Upstream request failed",
        };
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateError;

    #[tokio::test]
    async fn test_compose_error_is_not_leaked() {
        let err = ProxyError::Compose(ComposeError::Body(TemplateError::Execution(
            "can't evaluate field SecureJsonData".into(),
        )));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Upstream request failed");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ProxyError::NoRoute("/x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ProxyError::Timeout(30).status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ProxyError::InvalidTarget("bad".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ProxyError::Unauthorized("missing credentials").status(), StatusCode::UNAUTHORIZED);
    }
}
