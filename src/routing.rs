//! A small method + path router implementing [`Handler`].
//!
//! Lets one function serve several endpoints, whichever trigger feeds it.
//! Templates use `{name}` placeholders for single path segments; captures land
//! in `path_parameters` unless the trigger already supplied some.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::adapter::Handler;
use crate::api::helpers;
use crate::core::models::{NormalizedRequest, NormalizedResponse};
use crate::errors::AdapterError;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("static regex compile"));

fn trim_slashes(path: &str) -> &str {
    path.trim_matches('/')
}

#[derive(Debug)]
struct PathTemplate {
    pattern: Regex,
    names: Vec<String>,
}

impl PathTemplate {
    fn compile(template: &str) -> Result<Self, AdapterError> {
        let template = trim_slashes(template);
        let mut pattern = String::from("^");
        let mut names = Vec::new();
        let mut last = 0;
        for cap in PLACEHOLDER_RE.captures_iter(template) {
            let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            pattern.push_str(&regex::escape(&template[last..whole.start()]));
            pattern.push_str(&format!("(?P<{}>[^/]+)", name.as_str()));
            names.push(name.as_str().to_string());
            last = whole.end();
        }
        pattern.push_str(&regex::escape(&template[last..]));
        pattern.push('$');

        let pattern = Regex::new(&pattern)
            .map_err(|e| AdapterError::Config(format!("invalid route `{template}`: {e}")))?;
        Ok(Self { pattern, names })
    }

    fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let caps = self.pattern.captures(trim_slashes(path))?;
        Some(
            self.names
                .iter()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

struct Route {
    /// Upper-cased; empty accepts any method.
    methods: Vec<String>,
    template: PathTemplate,
    handler: Box<dyn Handler + Send + Sync>,
}

impl Route {
    fn accepts(&self, method: Option<&str>) -> bool {
        match method {
            // Triggers without a method concept match on path alone.
            None => true,
            Some(method) => {
                self.methods.is_empty() || self.methods.iter().any(|m| m == method)
            }
        }
    }
}

/// Dispatches requests to the first route whose method and path match;
/// anything else gets a 404.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns `Config` when the path template repeats a placeholder name.
    pub fn route<H>(mut self, method: &str, path: &str, handler: H) -> Result<Self, AdapterError>
    where
        H: Handler + Send + Sync + 'static,
    {
        self.routes.push(Route {
            methods: vec![method.to_ascii_uppercase()],
            template: PathTemplate::compile(path)?,
            handler: Box::new(handler),
        });
        Ok(self)
    }

    /// Registers `handler` for `path` regardless of method.
    ///
    /// # Errors
    ///
    /// Returns `Config` when the path template repeats a placeholder name.
    pub fn any<H>(mut self, path: &str, handler: H) -> Result<Self, AdapterError>
    where
        H: Handler + Send + Sync + 'static,
    {
        self.routes.push(Route {
            methods: Vec::new(),
            template: PathTemplate::compile(path)?,
            handler: Box::new(handler),
        });
        Ok(self)
    }
}

impl Handler for Router {
    fn handle(&self, request: &NormalizedRequest) -> anyhow::Result<NormalizedResponse> {
        let path = request.path.as_deref().unwrap_or_default();
        let method = request.method.as_deref();

        for route in &self.routes {
            let Some(captures) = route.template.captures(path) else {
                continue;
            };
            if !route.accepts(method) {
                continue;
            }
            debug!(path = %path, "Matched route");
            if captures.is_empty() || !request.path_parameters.is_empty() {
                return route.handler.handle(request);
            }
            let mut routed = request.clone();
            routed.path_parameters.extend(captures);
            return route.handler.handle(&routed);
        }

        info!(path = %path, method = ?method, "No route matched");
        Ok(helpers::err_response(404, "Not Found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &'static str) -> impl Fn(&NormalizedRequest) -> anyhow::Result<NormalizedResponse> {
        move |_request: &NormalizedRequest| Ok(NormalizedResponse::text(name))
    }

    fn request(method: Option<&str>, path: &str) -> NormalizedRequest {
        NormalizedRequest {
            method: method.map(ToString::to_string),
            path: Some(path.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn templates_capture_segments() {
        let template = PathTemplate::compile("/users/{id}/posts/{post}").unwrap();
        let caps = template.captures("users/7/posts/9").unwrap();
        assert_eq!(
            caps,
            vec![("id".to_string(), "7".to_string()), ("post".to_string(), "9".to_string())]
        );
        assert!(template.captures("/users/7").is_none());
    }

    #[test]
    fn repeated_placeholder_is_a_config_error() {
        assert!(matches!(
            PathTemplate::compile("/a/{id}/{id}"),
            Err(AdapterError::Config(_))
        ));
    }

    #[test]
    fn leading_slash_is_optional() {
        let router = Router::new().route("POST", "/create", named("create")).unwrap();
        let response = router.handle(&request(Some("POST"), "create")).unwrap();
        assert_eq!(response.status_code, 200);
    }

    #[test]
    fn wrong_method_is_not_found() {
        let router = Router::new().route("POST", "/model", named("create")).unwrap();
        let response = router.handle(&request(Some("GET"), "/model")).unwrap();
        assert_eq!(response.status_code, 404);
    }

    #[test]
    fn captures_fill_path_parameters() {
        let router = Router::new()
            .route("GET", "/model/{id}", |request: &NormalizedRequest| -> anyhow::Result<NormalizedResponse> {
                Ok(NormalizedResponse::text(
                    request.path_parameters.get("id").cloned().unwrap_or_default(),
                ))
            })
            .unwrap();
        let response = router.handle(&request(Some("GET"), "/model/42")).unwrap();
        assert_eq!(response.body, crate::core::models::ResponseBody::Text("42".into()));
    }
}
