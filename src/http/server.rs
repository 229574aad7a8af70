//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (access control, request ID, tracing)
//! - Bind server to listener
//! - Dispatch requests to the routing engine and director
//! - Swap in reloaded configuration without dropping connections
//! - Observability (metrics, correlation IDs)

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::compose::IdentityHeaderSettings;
use crate::config::ProxyConfig;
use crate::http::request::{RequestIdExt, UuidRequestId};
use crate::identity::{CallerIdentity, IdentityResolver};
use crate::observability::metrics;
use crate::proxy::{build_client, forward, Director, HttpClient, ProxyError};
use crate::routing::{RouteError, Router as ProxyRouter};
use crate::security::access_control_middleware;

/// Everything derived from one configuration snapshot.
pub struct ProxyState {
    pub config: ProxyConfig,
    pub router: ProxyRouter,
    pub director: Director,
    pub resolver: IdentityResolver,
    pub client: HttpClient,
}

impl ProxyState {
    pub fn from_config(config: ProxyConfig) -> Result<Self, RouteError> {
        let router = ProxyRouter::from_config(&config)?;
        let director = Director::new(IdentityHeaderSettings {
            login_cookie_name: config.identity.login_cookie_name.clone(),
        });
        let resolver = IdentityResolver::from_config(&config.identity);
        let client = build_client(&config.timeouts);

        Ok(Self {
            config,
            router,
            director,
            resolver,
            client,
        })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<ProxyState>>,
}

impl AppState {
    pub fn new(state: ProxyState) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(state)),
        }
    }

    /// Replace the active snapshot. A config that fails to compile is
    /// dropped and the current one stays active.
    pub fn reload(&self, config: ProxyConfig) -> bool {
        let current = self.inner.load();
        if current.config.listener.bind_address != config.listener.bind_address {
            tracing::warn!(
                current = %current.config.listener.bind_address,
                requested = %config.listener.bind_address,
                "Listener address changes require a restart"
            );
        }

        match ProxyState::from_config(config) {
            Ok(state) => {
                let routes = state.router.routes().len();
                self.inner.store(Arc::new(state));
                metrics::record_reload(true);
                tracing::info!(routes, "Configuration reloaded");
                true
            }
            Err(e) => {
                metrics::record_reload(false);
                tracing::error!(error = %e, "Reloaded configuration rejected, keeping current");
                false
            }
        }
    }
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, RouteError> {
        let state = AppState::new(ProxyState::from_config(config)?);
        let router = Self::build_router(&state);
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Upstream timeouts are applied per request in `forward`, from the
    /// snapshot the request started with.
    fn build_router(state: &AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .layer(middleware::from_fn_with_state(state.clone(), access_control_middleware))
            .with_state(state.clone())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Handle to the live state, for reloads outside `run`.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configs received on `config_updates` replace the active routes and
    /// identities; in-flight requests finish on the snapshot they started with.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                state.reload(config);
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Looks up the route, directs the request and forwards it.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let inner = state.inner.load_full();

    let request_id = request.request_id().to_string();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    tracing::debug!(request_id = %request_id, method = %method, path = %path, "Proxying request");

    let Some(route) = inner.router.match_request(&request) else {
        tracing::warn!(request_id = %request_id, path = %path, "No route matched");
        metrics::record_request(&method, 404, "none", start_time);
        return ProxyError::NoRoute(path).into_response();
    };

    let Some(identity) = request.extensions().get::<CallerIdentity>().cloned() else {
        tracing::error!(request_id = %request_id, "Request reached the proxy without a resolved caller");
        metrics::record_rejected(&route.name, "auth");
        return ProxyError::Unauthorized("no resolved caller").into_response();
    };
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let outbound = match inner.director.direct(request, &route, &identity, remote_addr) {
        Ok(req) => req,
        Err(e) => {
            if let ProxyError::Compose(compose) = &e {
                metrics::record_rejected(&route.name, compose.stage());
            }
            tracing::warn!(
                request_id = %request_id,
                route = %route.name,
                error = %e,
                "Request rejected before forwarding"
            );
            metrics::record_request(&method, e.status().as_u16(), &route.name, start_time);
            return e.into_response();
        }
    };

    let upstream = outbound.uri().to_string();
    match forward(&inner.client, outbound, inner.config.timeouts.request_secs).await {
        Ok(response) => {
            metrics::record_request(&method, response.status().as_u16(), &route.name, start_time);
            response
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                route = %route.name,
                upstream = %upstream,
                error = %e,
                "Upstream error"
            );
            metrics::record_request(&method, e.status().as_u16(), &route.name, start_time);
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{RouteConfig, TemplateDeclaration, UserConfig};
    use axum::http::{header, StatusCode};
    use tower::ServiceExt;

    fn config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.identity.users.push(UserConfig {
            token: "t-alice".into(),
            login: "alice".into(),
            org_id: 7,
            org_name: "Acme".into(),
            name: "Alice".into(),
            email: "alice@acme.test".into(),
            user_id: 42,
            is_grafana_admin: false,
            org_role: Default::default(),
        });
        config.routes.push(RouteConfig {
            name: "broken".into(),
            host: None,
            path_prefix: "/broken".into(),
            priority: 0,
            // Never contacted: composition fails first.
            target_url: Some("http://127.0.0.1:1".into()),
            forward_identity: true,
            headers: vec![TemplateDeclaration {
                name: "X-Missing".into(),
                content: "{{.JsonData.nope.deeper}}".into(),
            }],
            url_params: Vec::new(),
            body: None,
            json_data: Default::default(),
            secure_json_data: Default::default(),
        });
        config
    }

    fn request(path: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_unauthenticated_is_rejected() {
        let server = HttpServer::new(config()).unwrap();

        let response = server.router.clone().oneshot(request("/broken", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = server.router.oneshot(request("/broken", Some("bogus"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_no_route() {
        let server = HttpServer::new(config()).unwrap();
        let response = server.router.oneshot(request("/elsewhere", Some("t-alice"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_composition_failure_is_generic_502() {
        let server = HttpServer::new(config()).unwrap();
        let response = server.router.oneshot(request("/broken/x", Some("t-alice"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_text(response).await, "Upstream request failed");
    }

    #[tokio::test]
    async fn test_reload_swaps_routes() {
        let server = HttpServer::new(config()).unwrap();
        let state = server.state();

        let mut next = config();
        next.routes[0].path_prefix = "/moved".into();
        assert!(state.reload(next));

        let response = server.router.clone().oneshot(request("/broken/x", Some("t-alice"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = server.router.oneshot(request("/moved/x", Some("t-alice"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_rejected_reload_keeps_current() {
        let server = HttpServer::new(config()).unwrap();
        let state = server.state();

        let mut next = config();
        next.routes[0].body = Some("{{.Broken".into());
        assert!(!state.reload(next));
        assert_eq!(state.inner.load().router.routes()[0].path_prefix, "/broken");
    }
}
