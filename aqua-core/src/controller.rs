//! Controller declaration and registration.
//!
//! A controller groups an optional path prefix with routes, the handlers
//! they name, per-handler parameter bindings and interceptors. It is built
//! with [`ControllerBuilder`] and consumed once by [`register_controller`],
//! which resolves every handler name before touching the route table.
//!
//! # Examples
//!
//! ```
//! use aqua_core::{handler_fn, register_controller, ControllerBuilder, HandlerArgs, ResponseSink, RouteTable};
//!
//! let users = ControllerBuilder::new("UserController")
//!     .prefix("/api/users")
//!     .get("/", "list")
//!     .handler("list", handler_fn(|_args: HandlerArgs, _res: ResponseSink| async move {
//!         Ok(Some(serde_json::json!({ "users": [] })))
//!     }))
//!     .build();
//!
//! let table = RouteTable::new();
//! register_controller(&table, &users).unwrap();
//! assert!(table.match_route("GET", "/api/users").is_some());
//! ```

use crate::{
    Controller, ControllerMetadata, Endpoint, Error, Handler, HttpMethod, Interceptor, Middleware,
    MAX_ARGUMENT_INDEX, ParameterBinding, RouteMetadata, RouteTable,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Fluent builder for a [`ControllerDefinition`].
pub struct ControllerBuilder {
    definition: ControllerDefinition,
}

impl ControllerBuilder {
    /// Start an undeclared controller. Call [`prefix`](Self::prefix) or
    /// [`declare`](Self::declare) before registering it.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            definition: ControllerDefinition {
                name: name.into(),
                metadata: None,
                routes: Vec::new(),
                handlers: HashMap::new(),
                bindings: HashMap::new(),
                interceptors: Vec::new(),
                method_interceptors: HashMap::new(),
            },
        }
    }

    /// Declare the controller without a prefix.
    pub fn declare(mut self) -> Self {
        if self.definition.metadata.is_none() {
            self.definition.metadata = Some(ControllerMetadata::default());
        }
        self
    }

    /// Declare the controller with a path prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.definition.metadata = Some(ControllerMetadata {
            prefix: Some(prefix.into()),
        });
        self
    }

    /// Declare a route.
    pub fn route(mut self, method: HttpMethod, path: impl Into<String>, handler: impl Into<String>) -> Self {
        self.definition.routes.push(RouteMetadata {
            method,
            path: path.into(),
            handler_name: handler.into(),
            middleware: Vec::new(),
        });
        self
    }

    pub fn get(self, path: impl Into<String>, handler: impl Into<String>) -> Self {
        self.route(HttpMethod::GET, path, handler)
    }

    pub fn post(self, path: impl Into<String>, handler: impl Into<String>) -> Self {
        self.route(HttpMethod::POST, path, handler)
    }

    pub fn put(self, path: impl Into<String>, handler: impl Into<String>) -> Self {
        self.route(HttpMethod::PUT, path, handler)
    }

    pub fn delete(self, path: impl Into<String>, handler: impl Into<String>) -> Self {
        self.route(HttpMethod::DELETE, path, handler)
    }

    pub fn patch(self, path: impl Into<String>, handler: impl Into<String>) -> Self {
        self.route(HttpMethod::PATCH, path, handler)
    }

    pub fn options(self, path: impl Into<String>, handler: impl Into<String>) -> Self {
        self.route(HttpMethod::OPTIONS, path, handler)
    }

    pub fn head(self, path: impl Into<String>, handler: impl Into<String>) -> Self {
        self.route(HttpMethod::HEAD, path, handler)
    }

    /// Attach route middleware to the most recently declared route.
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        match self.definition.routes.last_mut() {
            Some(route) => route.middleware.push(middleware),
            None => debug!(
                controller = %self.definition.name,
                "Route middleware given before any route; ignored"
            ),
        }
        self
    }

    /// Provide the handler for `name`.
    pub fn handler(mut self, name: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        self.definition.handlers.insert(name.into(), handler);
        self
    }

    /// Add a parameter binding to a handler.
    pub fn bind(mut self, handler: impl Into<String>, binding: ParameterBinding) -> Self {
        self.definition
            .bindings
            .entry(handler.into())
            .or_default()
            .push(binding);
        self
    }

    /// Add a class-scoped interceptor.
    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.definition.interceptors.push(interceptor);
        self
    }

    /// Add a method-scoped interceptor.
    pub fn method_interceptor(mut self, handler: impl Into<String>, interceptor: Arc<dyn Interceptor>) -> Self {
        self.definition
            .method_interceptors
            .entry(handler.into())
            .or_default()
            .push(interceptor);
        self
    }

    pub fn build(self) -> ControllerDefinition {
        self.definition
    }
}

/// Immutable controller record produced by [`ControllerBuilder`].
pub struct ControllerDefinition {
    name: String,
    metadata: Option<ControllerMetadata>,
    routes: Vec<RouteMetadata>,
    handlers: HashMap<String, Arc<dyn Handler>>,
    bindings: HashMap<String, Vec<ParameterBinding>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    method_interceptors: HashMap<String, Vec<Arc<dyn Interceptor>>>,
}

impl Controller for ControllerDefinition {
    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> Option<&ControllerMetadata> {
        self.metadata.as_ref()
    }

    fn routes(&self) -> &[RouteMetadata] {
        &self.routes
    }

    fn handler(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    fn bindings(&self, handler: &str) -> Vec<ParameterBinding> {
        self.bindings.get(handler).cloned().unwrap_or_default()
    }

    fn interceptors(&self) -> Vec<Arc<dyn Interceptor>> {
        self.interceptors.clone()
    }

    fn method_interceptors(&self, handler: &str) -> Vec<Arc<dyn Interceptor>> {
        self.method_interceptors
            .get(handler)
            .cloned()
            .unwrap_or_default()
    }
}

/// Register every route of `controller` on `table`.
///
/// Fails without registering anything if the controller is undeclared or
/// any route names a handler the controller does not provide. Returns the
/// number of routes added.
pub fn register_controller(table: &RouteTable, controller: &dyn Controller) -> Result<usize, Error> {
    let metadata = controller
        .metadata()
        .ok_or_else(|| Error::MissingControllerDeclaration(controller.name().to_string()))?;

    let mut resolved = Vec::with_capacity(controller.routes().len());
    for route in controller.routes() {
        let handler = controller
            .handler(&route.handler_name)
            .ok_or_else(|| Error::HandlerNotFound {
                handler: route.handler_name.clone(),
                controller: controller.name().to_string(),
            })?;
        if let Some(binding) = controller
            .bindings(&route.handler_name)
            .iter()
            .find(|b| !b.is_in_range())
        {
            return Err(Error::InvalidBinding {
                handler: route.handler_name.clone(),
                index: binding.index,
                max: MAX_ARGUMENT_INDEX,
            });
        }
        resolved.push((route, handler));
    }

    for (route, handler) in &resolved {
        let full_path = match &metadata.prefix {
            Some(prefix) => format!("{}{}", prefix, route.path),
            None => route.path.clone(),
        };
        let endpoint = Endpoint::new(handler.clone())
            .named(&route.handler_name)
            .with_bindings(controller.bindings(&route.handler_name))
            .with_interceptors(controller.all_interceptors(&route.handler_name));

        table.register(
            route.method.as_str(),
            &full_path,
            endpoint,
            route.middleware.clone(),
        );
    }

    info!(
        controller = %controller.name(),
        prefix = metadata.prefix.as_deref().unwrap_or(""),
        routes = resolved.len(),
        "Registered controller"
    );
    Ok(resolved.len())
}
