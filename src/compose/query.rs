//! Query string composition.

use url::form_urlencoded;

use crate::compose::ComposeError;
use crate::routing::Route;
use crate::template::TemplateContext;

/// Append the route's url params to `base_query` and re-encode.
///
/// Parameters accumulate: two declarations resolving to the same name both
/// end up in the query. Keys are sorted; values of one key keep their order.
pub fn compose_query(
    base_query: Option<&str>,
    route: &Route,
    context: &TemplateContext,
) -> Result<String, ComposeError> {
    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(base_query.unwrap_or("").as_bytes())
        .into_owned()
        .collect();

    for (index, decl) in route.url_params.iter().enumerate() {
        let name = decl
            .name
            .render(context)
            .map_err(|source| ComposeError::Query { index, source })?;
        let content = decl
            .content
            .render(context)
            .map_err(|source| ComposeError::Query { index, source })?;
        pairs.push((name, content));
    }

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish())
}
