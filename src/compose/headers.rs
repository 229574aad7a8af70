//! Header composition.
//!
//! # Responsibilities
//! - Strip caller-supplied identity headers from every inbound request
//! - Add identity headers for non-anonymous callers when the route forwards identity
//! - Extract the login session id from the configured cookie
//! - Resolve route header templates into a header set
//!
//! # Design Decisions
//! - Identity headers are removed before they are (maybe) set again, so a
//!   forged `X-Grafana-*` header never reaches the upstream
//! - A session cookie that fails to decode omits the session-id header
//!   instead of failing the request
//! - Route headers overwrite each other in declaration order

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;

use crate::compose::ComposeError;
use crate::identity::CallerIdentity;
use crate::routing::Route;
use crate::template::TemplateContext;

pub const X_GRAFANA_USER: HeaderName = HeaderName::from_static("x-grafana-user");
pub const X_GRAFANA_ORG_ID: HeaderName = HeaderName::from_static("x-grafana-org-id");
pub const X_GRAFANA_EXT_ORG_ID: HeaderName = HeaderName::from_static("x-grafana-ext-org-id");
pub const X_GRAFANA_EXT_ORG_NAME: HeaderName = HeaderName::from_static("x-grafana-ext-org-name");
pub const X_GRAFANA_EXT_USER_NAME: HeaderName = HeaderName::from_static("x-grafana-ext-user-name");
pub const X_GRAFANA_EXT_USER_EMAIL: HeaderName = HeaderName::from_static("x-grafana-ext-user-email");
pub const X_GRAFANA_EXT_USER_ID: HeaderName = HeaderName::from_static("x-grafana-ext-user-id");
pub const X_GRAFANA_EXT_USER_AGENT: HeaderName = HeaderName::from_static("x-grafana-ext-user-agent");
pub const X_GRAFANA_EXT_REMOTE_ADDR: HeaderName = HeaderName::from_static("x-grafana-ext-remote-addr");
pub const X_GRAFANA_EXT_ADMIN: HeaderName = HeaderName::from_static("x-grafana-ext-admin");
pub const X_GRAFANA_EXT_ORG_ROLE: HeaderName = HeaderName::from_static("x-grafana-ext-org-role");
pub const X_GRAFANA_EXT_SESSION_ID: HeaderName = HeaderName::from_static("x-grafana-ext-session-id");

/// Every header this proxy asserts about the caller.
pub const IDENTITY_HEADERS: [HeaderName; 12] = [
    X_GRAFANA_USER,
    X_GRAFANA_ORG_ID,
    X_GRAFANA_EXT_ORG_ID,
    X_GRAFANA_EXT_ORG_NAME,
    X_GRAFANA_EXT_USER_NAME,
    X_GRAFANA_EXT_USER_EMAIL,
    X_GRAFANA_EXT_USER_ID,
    X_GRAFANA_EXT_USER_AGENT,
    X_GRAFANA_EXT_REMOTE_ADDR,
    X_GRAFANA_EXT_ADMIN,
    X_GRAFANA_EXT_ORG_ROLE,
    X_GRAFANA_EXT_SESSION_ID,
];

/// Process-wide settings for identity headers.
#[derive(Debug, Clone, Default)]
pub struct IdentityHeaderSettings {
    /// Cookie whose value is forwarded as the session id.
    pub login_cookie_name: Option<String>,
}

/// Apply the identity header policy to `headers` in place.
///
/// Identity headers already present are always removed. They are set again
/// only when `forward` is true and the caller is not anonymous.
pub fn compose_identity_headers(
    identity: &CallerIdentity,
    settings: &IdentityHeaderSettings,
    forward: bool,
    headers: &mut HeaderMap,
    remote_addr: Option<SocketAddr>,
) {
    let user_agent = headers
        .get(header::USER_AGENT)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(""));
    let session_id = settings
        .login_cookie_name
        .as_deref()
        .and_then(|name| session_id_from_cookie(headers, name));

    for name in &IDENTITY_HEADERS {
        headers.remove(name);
    }

    if !forward || identity.is_anonymous {
        return;
    }

    set_header(headers, X_GRAFANA_USER, &identity.login);
    set_header(headers, X_GRAFANA_ORG_ID, &identity.org_id.to_string());
    set_header(headers, X_GRAFANA_EXT_ORG_ID, &identity.org_id.to_string());
    set_header(headers, X_GRAFANA_EXT_ORG_NAME, &identity.org_name);
    set_header(headers, X_GRAFANA_EXT_USER_NAME, &identity.name);
    set_header(headers, X_GRAFANA_EXT_USER_EMAIL, &identity.email);
    set_header(headers, X_GRAFANA_EXT_USER_ID, &identity.user_id.to_string());
    headers.insert(X_GRAFANA_EXT_USER_AGENT, user_agent);
    set_header(
        headers,
        X_GRAFANA_EXT_REMOTE_ADDR,
        &remote_addr.map(|a| a.to_string()).unwrap_or_default(),
    );
    set_header(headers, X_GRAFANA_EXT_ADMIN, if identity.is_grafana_admin { "true" } else { "false" });
    set_header(headers, X_GRAFANA_EXT_ORG_ROLE, identity.org_role.as_str());

    if let Some(session_id) = session_id {
        headers.insert(X_GRAFANA_EXT_SESSION_ID, session_id);
    }
}

fn set_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(_) => tracing::warn!(header = %name, "Identity value is not a valid header value, skipping"),
    }
}

/// Find the first cookie called `name` and URL-unescape its value.
fn session_id_from_cookie(headers: &HeaderMap, name: &str) -> Option<HeaderValue> {
    let raw = find_cookie(headers, name)?;
    let decoded = match query_unescape(raw) {
        Ok(bytes) => bytes,
        Err(offset) => {
            tracing::debug!(cookie = %name, offset, "Session cookie is not validly escaped, omitting session id");
            return None;
        }
    };
    match HeaderValue::from_bytes(&decoded) {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::debug!(cookie = %name, "Decoded session cookie is not a valid header value, omitting session id");
            None
        }
    }
}

fn find_cookie<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| k.trim() == name)
        .map(|(_, v)| {
            let v = v.trim();
            v.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(v)
        })
}

/// Query-string unescaping: `+` is a space, `%XX` must be two hex digits.
///
/// Returns the offset of the first malformed escape on failure.
fn query_unescape(s: &str) -> Result<Vec<u8>, usize> {
    let bytes = s.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'%' {
            let valid = bytes.get(i + 1..i + 3).is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(i);
            }
        }
    }
    let spaced = s.replace('+', " ");
    Ok(percent_decode_str(&spaced).collect())
}

/// Resolve the route's header declarations, in order.
///
/// Later declarations with the same resolved name replace earlier ones.
pub fn compose_route_headers(route: &Route, context: &TemplateContext) -> Result<HeaderMap, ComposeError> {
    let mut headers = HeaderMap::new();
    for (index, decl) in route.headers.iter().enumerate() {
        let name = decl
            .name
            .render(context)
            .map_err(|source| ComposeError::Header { index, source })?;
        let content = decl
            .content
            .render(context)
            .map_err(|source| ComposeError::Header { index, source })?;

        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| ComposeError::InvalidHeaderName { index })?;
        let value = HeaderValue::from_str(&content).map_err(|_| ComposeError::InvalidHeaderValue { index })?;
        headers.insert(name, value);
    }
    Ok(headers)
}
