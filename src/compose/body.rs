//! Body composition.

use bytes::Bytes;

use crate::compose::ComposeError;
use crate::routing::Route;
use crate::template::TemplateContext;

/// Render the route's body template.
///
/// `None` means the route has no body template and the inbound body is
/// forwarded untouched. The length of the returned bytes is the exact
/// `Content-Length` of the outbound request.
pub fn compose_body(route: &Route, context: &TemplateContext) -> Result<Option<Bytes>, ComposeError> {
    let Some(template) = &route.body else {
        return Ok(None);
    };
    let rendered = template.render(context).map_err(ComposeError::Body)?;
    Ok(Some(Bytes::from(rendered)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::template_context;
    use crate::compose::test_support::*;

    #[test]
    fn test_no_template_passes_through() {
        let route = compile(&route_config());
        assert!(compose_body(&route, &template_context(&route, &alice())).unwrap().is_none());
    }

    #[test]
    fn test_body_rendered_once() {
        let mut cfg = route_config();
        cfg.body = Some(r#"{"login":"{{.User.Login}}","name":"{{.User.Name}}"}"#.into());
        let route = compile(&cfg);

        let body = compose_body(&route, &template_context(&route, &alice())).unwrap().unwrap();
        let expected = r#"{"login":"alice","name":"Alice Liddell"}"#;
        assert_eq!(body, expected.as_bytes());
        assert_eq!(body.len(), expected.len());
    }

    #[test]
    fn test_multibyte_length() {
        let mut cfg = route_config();
        cfg.body = Some("héllo {{.JsonData.tenant}}".into());
        let route = compile(&cfg);

        let body = compose_body(&route, &template_context(&route, &alice())).unwrap().unwrap();
        assert_eq!(body.len(), "héllo acme".len());
    }

    #[test]
    fn test_empty_template_yields_empty_body() {
        let mut cfg = route_config();
        cfg.body = Some(String::new());
        let route = compile(&cfg);

        let body = compose_body(&route, &template_context(&route, &alice())).unwrap();
        assert_eq!(body.as_deref(), Some(&b""[..]));
    }

    #[test]
    fn test_failure() {
        let mut cfg = route_config();
        cfg.body = Some("{{.User.Login.more}}".into());
        let route = compile(&cfg);
        assert!(matches!(
            compose_body(&route, &template_context(&route, &alice())),
            Err(ComposeError::Body(_))
        ));
    }
}
