// Route table: registration, normalization and method+path matching

use crate::{Handler, Interceptor, Middleware, MiddlewareChain, ParameterBinding};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// What a matched route invokes: the handler plus its per-method metadata.
#[derive(Clone)]
pub struct Endpoint {
    pub handler: Arc<dyn Handler>,
    pub handler_name: Arc<str>,
    pub bindings: Arc<[ParameterBinding]>,
    /// Class-scoped followed by method-scoped interceptors
    pub interceptors: Arc<[Arc<dyn Interceptor>]>,
}

impl Endpoint {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            handler,
            handler_name: Arc::from("anonymous"),
            bindings: Arc::from(Vec::new()),
            interceptors: Arc::from(Vec::new()),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.handler_name = Arc::from(name);
        self
    }

    pub fn with_bindings(mut self, bindings: Vec<ParameterBinding>) -> Self {
        self.bindings = Arc::from(bindings);
        self
    }

    pub fn with_interceptors(mut self, interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        self.interceptors = Arc::from(interceptors);
        self
    }
}

impl From<Arc<dyn Handler>> for Endpoint {
    fn from(handler: Arc<dyn Handler>) -> Self {
        Endpoint::new(handler)
    }
}

/// Route definition with handler
#[derive(Clone)]
pub struct Route {
    /// Upper-cased HTTP verb
    pub method: String,
    /// Normalized path pattern
    pub path: String,
    segments: Vec<Segment>,
    pub endpoint: Endpoint,
    /// Global middleware (as of registration) followed by route middleware
    pub middleware: MiddlewareChain,
}

impl Route {
    /// Number of `/`-separated segments in the pattern.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Match a normalized path against this route's pattern.
    fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
            }
        }
        Some(params)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("handler", &self.endpoint.handler_name)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

fn parse_segments(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .map(|part| match part.strip_prefix(':') {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(part.to_string()),
        })
        .collect()
}

/// Strip trailing slashes one at a time, never reducing below one character.
pub fn normalize_path(path: &str) -> &str {
    let mut path = path;
    while path.len() > 1 && path.ends_with('/') {
        path = &path[..path.len() - 1];
    }
    path
}

/// A successful match
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub params: HashMap<String, String>,
}

/// Ordered, append-only route table.
///
/// The first registered route whose method and segments match wins, so
/// literal routes that overlap a parametrized one must be registered first.
#[derive(Default)]
pub struct RouteTable {
    routes: RwLock<Vec<Arc<Route>>>,
    global_middleware: RwLock<Vec<Arc<dyn Middleware>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append global middleware; applies to routes registered afterwards.
    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.global_middleware.write().push(middleware);
    }

    /// Register a route.
    pub fn register(
        &self,
        method: &str,
        path: &str,
        endpoint: impl Into<Endpoint>,
        middleware: Vec<Arc<dyn Middleware>>,
    ) -> Arc<Route> {
        let path = normalize_path(path).to_string();
        let mut chain = self.global_middleware.read().clone();
        chain.extend(middleware);

        let route = Arc::new(Route {
            method: method.to_ascii_uppercase(),
            segments: parse_segments(&path),
            path,
            endpoint: endpoint.into(),
            middleware: MiddlewareChain::from_vec(chain),
        });

        debug!(
            method = %route.method,
            path = %route.path,
            handler = %route.endpoint.handler_name,
            "Registered route"
        );
        self.routes.write().push(route.clone());
        route
    }

    /// Find the first route matching `method` and `path`.
    pub fn match_route(&self, method: &str, path: &str) -> Option<RouteMatch> {
        let method = method.to_ascii_uppercase();
        let path = normalize_path(path);

        let routes = self.routes.read();
        for route in routes.iter() {
            if route.method != method {
                continue;
            }
            if let Some(params) = route.match_path(path) {
                return Some(RouteMatch {
                    route: route.clone(),
                    params,
                });
            }
        }
        None
    }

    /// Snapshot of all registered routes, in registration order.
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.routes.read().clone()
    }

    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{handler_fn, middleware_fn, HandlerArgs, Next, RequestContext, ResponseSink};

    fn endpoint(name: &str) -> Endpoint {
        Endpoint::new(handler_fn(|_args: HandlerArgs, _res: ResponseSink| async move { Ok(None) }))
            .named(name)
    }

    fn noop_middleware() -> Arc<dyn Middleware> {
        middleware_fn(|req: RequestContext, _res: ResponseSink, next: Next| async move {
            next(req).await
        })
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("/users/"), "/users");
        assert_eq!(normalize_path("/users///"), "/users");
        assert_eq!(normalize_path("///"), "/");
        assert_eq!(normalize_path("/users"), "/users");
    }

    #[test]
    fn test_match_static() {
        let table = RouteTable::new();
        table.register("GET", "/users", endpoint("list"), vec![]);
        let m = table.match_route("GET", "/users").unwrap();
        assert_eq!(m.route.endpoint.handler_name.as_ref(), "list");
        assert!(m.params.is_empty());
    }

    #[test]
    fn test_match_with_params() {
        let table = RouteTable::new();
        table.register("get", "/users/:user_id/posts/:post_id", endpoint("post"), vec![]);
        let m = table.match_route("GET", "/users/123/posts/456").unwrap();
        assert_eq!(m.params.get("user_id"), Some(&"123".to_string()));
        assert_eq!(m.params.get("post_id"), Some(&"456".to_string()));
        assert_eq!(m.route.method, "GET");
    }

    #[test]
    fn test_method_is_case_insensitive() {
        let table = RouteTable::new();
        table.register("post", "/users", endpoint("create"), vec![]);
        assert!(table.match_route("POST", "/users").is_some());
        assert!(table.match_route("post", "/users").is_some());
        assert!(table.match_route("GET", "/users").is_none());
    }

    #[test]
    fn test_trailing_slashes_match_same_route() {
        let table = RouteTable::new();
        table.register("GET", "/users/:id/", endpoint("get"), vec![]);
        for path in ["/users/7", "/users/7/", "/users/7///"] {
            let m = table.match_route("GET", path).unwrap();
            assert_eq!(m.params.get("id"), Some(&"7".to_string()));
        }
    }

    #[test]
    fn test_root_route() {
        let table = RouteTable::new();
        table.register("GET", "/", endpoint("root"), vec![]);
        assert!(table.match_route("GET", "/").is_some());
        assert!(table.match_route("GET", "//").is_some());
        assert!(table.match_route("GET", "/x").is_none());
    }

    #[test]
    fn test_segment_count_must_match() {
        let table = RouteTable::new();
        table.register("GET", "/users/:id", endpoint("get"), vec![]);
        assert!(table.match_route("GET", "/users/123/extra").is_none());
        assert!(table.match_route("GET", "/users").is_none());
    }

    #[test]
    fn test_first_registered_wins() {
        let table = RouteTable::new();
        table.register("GET", "/users/:id", endpoint("by_id"), vec![]);
        table.register("GET", "/users/active", endpoint("active"), vec![]);

        let m = table.match_route("GET", "/users/active").unwrap();
        assert_eq!(m.route.endpoint.handler_name.as_ref(), "by_id");
        assert_eq!(m.params.get("id"), Some(&"active".to_string()));
    }

    #[test]
    fn test_params_are_not_coerced() {
        let table = RouteTable::new();
        table.register("GET", "/items/:id", endpoint("item"), vec![]);
        let m = table.match_route("GET", "/items/abc-123").unwrap();
        assert_eq!(m.params.get("id"), Some(&"abc-123".to_string()));
    }

    #[test]
    fn test_global_middleware_snapshot() {
        let table = RouteTable::new();
        table.register("GET", "/before", endpoint("before"), vec![]);
        table.use_middleware(noop_middleware());
        table.register("GET", "/after", endpoint("after"), vec![noop_middleware()]);

        let routes = table.routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].middleware.len(), 0);
        assert_eq!(routes[1].middleware.len(), 2);
    }

    #[test]
    fn test_routes_preserve_order() {
        let table = RouteTable::new();
        for i in 0..5 {
            table.register("GET", &format!("/test{}", i), endpoint("t"), vec![]);
        }
        let paths: Vec<String> = table.routes().iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, vec!["/test0", "/test1", "/test2", "/test3", "/test4"]);
        assert_eq!(table.routes()[0].segment_count(), 2);
    }
}
