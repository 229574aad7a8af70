//! Resolve callers from request credentials.

use axum::http::{header, HeaderMap};
use std::collections::HashMap;

use crate::config::schema::{IdentityConfig, UserConfig};
use crate::identity::CallerIdentity;

/// Outcome of looking up the caller for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Known caller (possibly anonymous).
    Caller(CallerIdentity),
    /// No credentials and anonymous access is disabled.
    Missing,
    /// Credentials present but not recognized.
    Invalid,
}

/// Static bearer-token identity table, built from configuration.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    users: HashMap<String, CallerIdentity>,
    allow_anonymous: bool,
}

impl IdentityResolver {
    pub fn from_config(config: &IdentityConfig) -> Self {
        let users = config
            .users
            .iter()
            .map(|u| (u.token.clone(), identity_from(u)))
            .collect();
        Self {
            users,
            allow_anonymous: config.allow_anonymous,
        }
    }

    /// Look up the caller from the `Authorization: Bearer` header.
    pub fn resolve(&self, headers: &HeaderMap) -> Resolution {
        let Some(value) = headers.get(header::AUTHORIZATION) else {
            return if self.allow_anonymous {
                Resolution::Caller(CallerIdentity::anonymous())
            } else {
                Resolution::Missing
            };
        };

        value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|token| self.users.get(token.trim()))
            .map(|user| Resolution::Caller(user.clone()))
            .unwrap_or(Resolution::Invalid)
    }
}

fn identity_from(user: &UserConfig) -> CallerIdentity {
    CallerIdentity {
        login: user.login.clone(),
        org_id: user.org_id,
        org_name: user.org_name.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
        user_id: user.user_id,
        is_grafana_admin: user.is_grafana_admin,
        org_role: user.org_role,
        is_anonymous: false,
    }
}
