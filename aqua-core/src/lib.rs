// Core library for the Aqua HTTP framework
// Routing, controller registration, middleware, interceptors, parameter
// binding and the dispatcher that ties them together

pub mod application;
pub mod binding;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod http;
pub mod interceptor;
pub mod logging;
pub mod middleware;
pub mod routing;
pub mod traits;

// Re-export commonly used types
pub use application::*;
pub use binding::*;
pub use controller::*;
pub use dispatcher::*;
pub use error::*;
pub use handler::*;
pub use http::*;
pub use interceptor::*;
pub use middleware::*;
pub use routing::*;
pub use traits::*;
