//! Upstream forwarding.

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;

use crate::config::schema::TimeoutConfig;
use crate::proxy::error::ProxyError;
use crate::security::headers::strip_hop_by_hop;

/// Shared client for upstream calls.
pub type HttpClient = Client<HttpConnector, Body>;

/// Build the upstream client from the timeout settings.
pub fn build_client(timeouts: &TimeoutConfig) -> HttpClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
    connector.set_nodelay(true);

    // Identity header names go out as `X-Grafana-User`, not `x-grafana-user`.
    Client::builder(TokioExecutor::new())
        .http1_title_case_headers(true)
        .build(connector)
}

/// Send `request` upstream and stream the response back.
///
/// The whole exchange up to response headers is bounded by `timeout_secs`.
pub async fn forward(client: &HttpClient, request: Request<Body>, timeout_secs: u64) -> Result<Response, ProxyError> {
    let pending = client.request(request);
    let response: hyper::Response<hyper::body::Incoming> = tokio::time::timeout(Duration::from_secs(timeout_secs), pending)
        .await
        .map_err(|_| ProxyError::Timeout(timeout_secs))?
        .map_err(ProxyError::Forwarding)?;

    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Ok(Response::from_parts(parts, Body::new(body)))
}
