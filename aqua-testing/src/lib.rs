//! Testing utilities for Aqua applications
//!
//! [`TestClient`] sends requests straight into a [`Dispatcher`](aqua_core::Dispatcher),
//! so routing, middleware, interceptors and validation all run without a
//! socket.
//!
//! ```
//! use aqua_core::{handler_fn, Application, ControllerBuilder, HandlerArgs, ResponseSink, ServerOptions};
//! use aqua_testing::{assert_json, assert_status, TestClient};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let controller = ControllerBuilder::new("HealthController")
//!     .declare()
//!     .get("/health", "check")
//!     .handler("check", handler_fn(|_args: HandlerArgs, _res: ResponseSink| async move {
//!         Ok(Some(json!({"status": "ok"})))
//!     }))
//!     .build();
//!
//! let app = Application::new(ServerOptions::default());
//! app.register_controller(&controller).unwrap();
//!
//! let client = TestClient::for_app(&app);
//! let response = client.get("/health/").await;
//! assert_status(&response, 200);
//! assert_json(&response, &json!({"status": "ok"}));
//! # });
//! ```

pub mod assertions;
pub mod test_client;

pub use assertions::*;
pub use test_client::*;
