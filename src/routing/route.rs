//! Compiled route definitions.
//!
//! # Responsibilities
//! - Compile every template of a `RouteConfig` once, at load time
//! - Resolve the upstream target URL (route override or default)
//! - Split the inbound path into the forwarded subpath
//!
//! # Design Decisions
//! - A `Route` is immutable after compilation and shared via `Arc`
//! - Compilation stops at the first broken template and names the field

use axum::body::Body;
use axum::http::Request;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::schema::{RouteConfig, TemplateDeclaration};
use crate::routing::matcher::{HostMatcher, Matcher, PathPrefixMatcher};
use crate::template::{Template, TemplateError};

/// Errors raised while compiling a route.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route {route:?}: invalid {field} template: {source}")]
    Template {
        route: String,
        field: String,
        #[source]
        source: TemplateError,
    },

    #[error("route {route:?}: invalid target url {url:?}: {reason}")]
    InvalidTarget { route: String, url: String, reason: String },

    #[error("route {route:?}: path_prefix {prefix:?} must start with '/'")]
    InvalidPrefix { route: String, prefix: String },

    #[error("route {route:?}: no target_url and no usable default upstream")]
    MissingTarget { route: String },
}

/// A header or query parameter declaration with both sides compiled.
#[derive(Debug, Clone)]
pub struct CompiledDeclaration {
    pub name: Template,
    pub content: Template,
}

/// A route ready to serve traffic.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub priority: u32,
    pub path_prefix: String,
    pub target: Url,
    pub forward_identity: bool,
    pub headers: Vec<CompiledDeclaration>,
    pub url_params: Vec<CompiledDeclaration>,
    pub body: Option<Template>,
    pub json_data: Value,
    pub secure_json_data: Value,
    prefix: PathPrefixMatcher,
    host: Option<HostMatcher>,
}

impl Route {
    /// Compile a route; `default_target` is used when the route has no `target_url`.
    pub fn compile(config: &RouteConfig, default_target: Option<&Url>) -> Result<Self, RouteError> {
        let route = config.name.clone();

        if !config.path_prefix.starts_with('/') {
            return Err(RouteError::InvalidPrefix {
                route,
                prefix: config.path_prefix.clone(),
            });
        }

        let target = match &config.target_url {
            Some(raw) => parse_target(raw).map_err(|reason| RouteError::InvalidTarget {
                route: route.clone(),
                url: raw.clone(),
                reason,
            })?,
            None => default_target
                .cloned()
                .ok_or_else(|| RouteError::MissingTarget { route: route.clone() })?,
        };

        let headers = compile_declarations(&route, "header", &config.headers)?;
        let url_params = compile_declarations(&route, "url param", &config.url_params)?;
        let body = config
            .body
            .as_deref()
            .map(|src| compile_template(&route, "body", src))
            .transpose()?;

        let secure_json_data = config
            .secure_json_data
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        Ok(Self {
            name: config.name.clone(),
            priority: config.priority,
            path_prefix: config.path_prefix.clone(),
            target,
            forward_identity: config.forward_identity,
            headers,
            url_params,
            body,
            json_data: Value::Object(config.json_data.clone()),
            secure_json_data: Value::Object(secure_json_data),
            prefix: PathPrefixMatcher::new(config.path_prefix.as_str()),
            host: config.host.as_deref().map(HostMatcher::new),
        })
    }

    pub fn matches(&self, req: &Request<Body>) -> bool {
        self.prefix.matches(req) && self.host.as_ref().map_or(true, |h| h.matches(req))
    }

    /// The part of `path` after the route prefix, without a leading slash.
    pub fn subpath<'p>(&self, path: &'p str) -> &'p str {
        self.prefix.strip(path).unwrap_or("")
    }
}

/// Parse an upstream base URL; only absolute `http` URLs with a host are accepted.
///
/// The upstream client speaks plain HTTP only.
pub fn parse_target(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme {:?}", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(url)
}

fn compile_template(route: &str, field: &str, source: &str) -> Result<Template, RouteError> {
    Template::parse(source).map_err(|source| RouteError::Template {
        route: route.to_string(),
        field: field.to_string(),
        source,
    })
}

fn compile_declarations(
    route: &str,
    kind: &str,
    declarations: &[TemplateDeclaration],
) -> Result<Vec<CompiledDeclaration>, RouteError> {
    declarations
        .iter()
        .enumerate()
        .map(|(i, decl)| {
            Ok(CompiledDeclaration {
                name: compile_template(route, &format!("{kind} #{i} name"), &decl.name)?,
                content: compile_template(route, &format!("{kind} #{i} content"), &decl.content)?,
            })
        })
        .collect()
}
