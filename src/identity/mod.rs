//! Authenticated caller identity.
//!
//! The identity is produced by the authentication middleware
//! (`security::access_control`) and consumed read-only by the composers.

pub mod resolver;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use resolver::{IdentityResolver, Resolution};

/// Role of the caller inside its organization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrgRole {
    #[default]
    Viewer,
    Editor,
    Admin,
}

impl OrgRole {
    pub fn as_str(self) -> &'static str {
        match self {
            OrgRole::Viewer => "Viewer",
            OrgRole::Editor => "Editor",
            OrgRole::Admin => "Admin",
        }
    }
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the caller on whose behalf a request is forwarded.
///
/// Serialized with PascalCase keys when exposed to templates as `.User`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallerIdentity {
    pub login: String,
    pub org_id: i64,
    pub org_name: String,
    pub name: String,
    pub email: String,
    pub user_id: i64,
    pub is_grafana_admin: bool,
    pub org_role: OrgRole,
    pub is_anonymous: bool,
}

impl CallerIdentity {
    /// The identity used for requests without credentials.
    pub fn anonymous() -> Self {
        Self {
            is_anonymous: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_field_names() {
        let user = CallerIdentity {
            login: "alice".into(),
            org_id: 7,
            org_role: OrgRole::Editor,
            ..Default::default()
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["Login"], json!("alice"));
        assert_eq!(value["OrgId"], json!(7));
        assert_eq!(value["OrgRole"], json!("Editor"));
        assert_eq!(value["IsGrafanaAdmin"], json!(false));
        assert_eq!(value["IsAnonymous"], json!(false));
    }

    #[test]
    fn test_anonymous() {
        assert!(CallerIdentity::anonymous().is_anonymous);
    }
}
