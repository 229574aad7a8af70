//! Template interpolation subsystem.
//!
//! # Data Flow
//! ```text
//! route template text (config load)
//!     → parse.rs (lex + parse into nodes, reject syntax errors)
//!     → Template (compiled, immutable, shared via Arc)
//!
//! per request:
//!     Template + TemplateContext
//!     → exec.rs (evaluate pipelines, print values)
//!     → resolved String
//! ```
//!
//! # Language
//! Literal text with `{{ pipeline }}` actions. A pipeline is a chain of
//! commands separated by `|`; each command is either a single operand
//! (`.`, `.A.B`, string/number/bool literal, `nil`, `( pipeline )`) or a
//! call to one of the built-in functions in [`funcs`]. `{{- ` and ` -}}` trim
//! surrounding whitespace, `{{/* ... */}}` is a comment. Quoted strings take
//! Go escapes, including `\x`, octal, `\u` and `\U`.
//!
//! # Design Decisions
//! - Fixed function set; unknown identifiers fail at parse time
//! - No I/O and no user-defined functions: evaluation is a pure function of
//!   (template, context)
//! - Error messages never echo context values (the context may hold secrets)

pub mod context;
pub mod funcs;

mod exec;
mod parse;

use std::fmt;
use thiserror::Error;

pub use context::TemplateContext;

/// Errors produced while compiling or rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Template text is not syntactically valid.
    #[error("template parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    /// Evaluation failed against the supplied context.
    #[error("template execution error: {0}")]
    Execution(String),
}

impl TemplateError {
    pub(crate) fn parse(offset: usize, message: impl Into<String>) -> Self {
        TemplateError::Parse {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn exec(message: impl Into<String>) -> Self {
        TemplateError::Execution(message.into())
    }
}

/// A compiled template.
#[derive(Clone)]
pub struct Template {
    source: String,
    nodes: Vec<parse::Node>,
}

impl Template {
    /// Compile `source` into a reusable template.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let nodes = parse::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            nodes,
        })
    }

    /// Evaluate the template against `context`.
    pub fn render(&self, context: &TemplateContext) -> Result<String, TemplateError> {
        exec::render(&self.nodes, context.as_value())
    }

}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("source", &self.source)
            .finish()
    }
}

/// Parse and render `text` in one step.
pub fn interpolate(text: &str, context: &TemplateContext) -> Result<String, TemplateError> {
    Template::parse(text)?.render(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> TemplateContext {
        TemplateContext::new()
            .with_field("JsonData", json!({ "tenant": "acme", "port": 8443, "tls": true }))
            .with_field("SecureJsonData", json!({ "token": "s3cr3t" }))
            .with_field("User", json!({ "Login": "alice", "OrgId": 7 }))
    }

    #[test]
    fn test_plain_text_passes_through() {
        let out = interpolate("no actions here", &ctx()).unwrap();
        assert_eq!(out, "no actions here");
    }

    #[test]
    fn test_field_substitution() {
        let out = interpolate("Bearer {{.SecureJsonData.token}}", &ctx()).unwrap();
        assert_eq!(out, "Bearer s3cr3t");

        let out = interpolate("{{ .User.Login }}@{{ .JsonData.tenant }}:{{.JsonData.port}}", &ctx()).unwrap();
        assert_eq!(out, "alice@acme:8443");
    }

    #[test]
    fn test_render_is_deterministic() {
        let tpl = Template::parse("{{.User.Login}}-{{.JsonData}}-{{orEmpty .JsonData.nope}}").unwrap();
        let c = ctx();
        let first = tpl.render(&c).unwrap();
        for _ in 0..10 {
            assert_eq!(tpl.render(&c).unwrap(), first);
        }
    }

    #[test]
    fn test_or_empty() {
        assert_eq!(interpolate("[{{orEmpty .JsonData.missing}}]", &ctx()).unwrap(), "[]");
        assert_eq!(interpolate("[{{orEmpty .JsonData.tenant}}]", &ctx()).unwrap(), "[acme]");
        assert_eq!(interpolate("[{{.JsonData.missing | orEmpty}}]", &ctx()).unwrap(), "[]");
        assert_eq!(interpolate("[{{orEmpty nil}}]", &ctx()).unwrap(), "[]");
    }

    #[test]
    fn test_missing_nested_key_prints_no_value() {
        assert_eq!(interpolate("{{.JsonData.missing}}", &ctx()).unwrap(), "<no value>");
    }

    #[test]
    fn test_unknown_top_level_field_fails() {
        let err = interpolate("{{.Nope}}", &ctx()).unwrap_err();
        assert!(matches!(err, TemplateError::Execution(_)));
    }

    #[test]
    fn test_field_of_null_fails() {
        let err = interpolate("{{.JsonData.missing.deeper}}", &ctx()).unwrap_err();
        assert!(matches!(err, TemplateError::Execution(_)));
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["{{.A", "{{}}", "{{ unknownFunc .A }}", "{{ \"open }}", "{{ .A .B }}", "{{ orEmpty }}", "{{ (.A }}"] {
            let err = Template::parse(bad).unwrap_err();
            assert!(matches!(err, TemplateError::Parse { .. }), "{bad} should fail to parse");
        }
    }

    #[test]
    fn test_errors_do_not_leak_context_values() {
        let err = interpolate("{{.SecureJsonData.token.inner}}", &ctx()).unwrap_err();
        assert!(!err.to_string().contains("s3cr3t"));
    }

    #[test]
    fn test_trim_markers_and_comments() {
        let out = interpolate("a  {{- .User.Login -}}  b{{/* ignored */}}", &ctx()).unwrap();
        assert_eq!(out, "aaliceb");
    }

    #[test]
    fn test_json_body_template() {
        let tpl = r#"{"user":"{{.User.Login}}","org":{{.User.OrgId}},"tls":{{.JsonData.tls}}}"#;
        let out = interpolate(tpl, &ctx()).unwrap();
        assert_eq!(out, r#"{"user":"alice","org":7,"tls":true}"#);
    }
}
