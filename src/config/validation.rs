//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Compile every route so template syntax errors surface at load time
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::routing::route::{parse_target, Route, RouteError};

/// A single semantic problem in the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid {field} address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("route #{0} has an empty name")]
    EmptyRouteName(usize),

    #[error("duplicate route name {0:?}")]
    DuplicateRoute(String),

    #[error("duplicate token for user {0:?}")]
    DuplicateToken(String),

    #[error("invalid upstream.default_url: {0}")]
    InvalidDefaultUpstream(String),

    #[error(transparent)]
    Route(#[from] RouteError),
}

/// Check the whole configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    let default_upstream = match parse_target(&config.upstream.default_url) {
        Ok(url) => Some(url),
        Err(reason) => {
            errors.push(ValidationError::InvalidDefaultUpstream(reason));
            None
        }
    };

    let mut tokens = HashSet::new();
    for user in &config.identity.users {
        if !tokens.insert(user.token.as_str()) {
            errors.push(ValidationError::DuplicateToken(user.login.clone()));
        }
    }

    let mut names = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        if route.name.trim().is_empty() {
            errors.push(ValidationError::EmptyRouteName(i));
        } else if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }

        match Route::compile(route, default_upstream.as_ref()) {
            Ok(_) => {}
            // Already reported as InvalidDefaultUpstream.
            Err(RouteError::MissingTarget { .. }) => {}
            Err(e) => errors.push(e.into()),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
