//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::identity::OrgRole;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Fallback upstream for routes without their own target.
    pub upstream: UpstreamConfig,

    /// Caller identity settings (session cookie, static users).
    pub identity: IdentityConfig,

    /// Route definitions.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Default upstream settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL used by routes that do not set `target_url`.
    pub default_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            default_url: "http://localhost:8080".to_string(),
        }
    }
}

/// Caller identity settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct IdentityConfig {
    /// Name of the login cookie forwarded as `X-Grafana-Ext-Session-Id`.
    pub login_cookie_name: Option<String>,

    /// Let requests without credentials through as the anonymous caller.
    pub allow_anonymous: bool,

    /// Static bearer-token identities.
    pub users: Vec<UserConfig>,
}

/// A caller known by bearer token.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    pub token: String,
    pub login: String,
    pub org_id: i64,
    #[serde(default)]
    pub org_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub is_grafana_admin: bool,
    #[serde(default)]
    pub org_role: OrgRole,
}

/// A proxied route with its templated rewrite rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Host header to match (exact match).
    pub host: Option<String>,

    /// Path prefix to match; the remainder is the forwarded subpath.
    pub path_prefix: String,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,

    /// Upstream base URL; falls back to `upstream.default_url`.
    pub target_url: Option<String>,

    /// Send the caller identity headers upstream.
    #[serde(default = "default_true")]
    pub forward_identity: bool,

    /// Header declarations, applied in order.
    #[serde(default)]
    pub headers: Vec<TemplateDeclaration>,

    /// Query parameter declarations, applied in order.
    #[serde(default)]
    pub url_params: Vec<TemplateDeclaration>,

    /// Body template; replaces the inbound body when set.
    pub body: Option<String>,

    /// Static route parameters, exposed as `.JsonData`.
    #[serde(default)]
    pub json_data: Map<String, Value>,

    /// Route secrets, exposed as `.SecureJsonData`.
    #[serde(default)]
    pub secure_json_data: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

/// A `{name, content}` pair where both sides are templates.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TemplateDeclaration {
    pub name: String,
    pub content: String,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
