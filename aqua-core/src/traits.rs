// Core traits for the Aqua framework

use crate::{Handler, Interceptor, Middleware, ParameterBinding};
use std::fmt;
use std::sync::Arc;

/// Controller-level declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerMetadata {
    /// Prepended verbatim to every route path of the controller
    pub prefix: Option<String>,
}

/// Definition of a route on a controller
#[derive(Clone)]
pub struct RouteMetadata {
    pub method: HttpMethod,
    pub path: String,
    pub handler_name: String,
    pub middleware: Vec<Arc<dyn Middleware>>,
}

impl fmt::Debug for RouteMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMetadata")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("handler_name", &self.handler_name)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// A group of routes sharing a prefix and interceptors.
///
/// Consumed once at startup by [`crate::register_controller`]. The usual
/// implementation is built with [`crate::ControllerBuilder`], but any type
/// can describe itself this way.
pub trait Controller: Send + Sync {
    /// Name used in registration errors
    fn name(&self) -> &str;

    /// Controller declaration; `None` means the type was never declared as
    /// a controller and registration fails.
    fn metadata(&self) -> Option<&ControllerMetadata>;

    /// Declared routes, in declaration order
    fn routes(&self) -> &[RouteMetadata];

    /// Resolve a handler by name
    fn handler(&self, name: &str) -> Option<Arc<dyn Handler>>;

    /// Parameter bindings declared for a handler
    fn bindings(&self, _handler: &str) -> Vec<ParameterBinding> {
        Vec::new()
    }

    /// Interceptors applied to every handler of this controller
    fn interceptors(&self) -> Vec<Arc<dyn Interceptor>> {
        Vec::new()
    }

    /// Interceptors applied to one handler
    fn method_interceptors(&self, _handler: &str) -> Vec<Arc<dyn Interceptor>> {
        Vec::new()
    }

    /// Class-scoped interceptors followed by method-scoped ones.
    fn all_interceptors(&self, handler: &str) -> Vec<Arc<dyn Interceptor>> {
        let mut all = self.interceptors();
        all.extend(self.method_interceptors(handler));
        all
    }
}

/// HTTP methods
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "DELETE" => Some(HttpMethod::DELETE),
            "PATCH" => Some(HttpMethod::PATCH),
            "HEAD" => Some(HttpMethod::HEAD),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
