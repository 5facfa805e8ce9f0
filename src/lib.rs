// Aqua - a small, explicit HTTP request-dispatch framework for Rust
//
// Controllers declare routes, middleware and interceptors wrap handlers,
// and parameter bindings validate request data before a handler runs.

// Re-export core functionality
pub use aqua_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use aqua_config;

#[cfg(feature = "testing")]
pub use aqua_testing;

#[cfg(feature = "validation")]
pub use aqua_validation;

/// Create an application with the given options.
///
/// Middleware listed in `options.middleware` is installed globally before
/// any controller is registered.
pub fn create_app(options: ServerOptions) -> Application {
    Application::new(options)
}

// Prelude for common imports
pub mod prelude {
    pub use crate::create_app;
    pub use crate::{
        Application,
        ChainFuture,
        Controller,
        ControllerBuilder,
        Dispatcher,
        Error,
        HandlerArgs,
        HandlerResult,
        HttpMethod,
        HttpResponse,
        Interceptor,
        InterceptorContext,
        InterceptorResult,
        Middleware,
        Next,
        ParameterBinding,
        RequestContext,
        ResponseSink,
        ServerOptions,
        ValidationError,
        ValidatorFn,
        handler_fn,
        interceptor_fn,
        middleware_fn,
    };

    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};

    #[cfg(feature = "validation")]
    pub use crate::aqua_validation::{array, boolean, number, object, optional, string};
}
