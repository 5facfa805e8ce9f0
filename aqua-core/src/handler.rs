// Route handlers and the arguments they receive

use crate::{BoundArgs, Error, RequestContext, ResponseSink};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// What a handler returns: `Some(value)` is written as JSON unless the
/// handler already wrote the response itself; `None` writes nothing.
pub type HandlerResult = Result<Option<Value>, Error>;

/// Positional arguments for a handler invocation.
///
/// When the route declares no parameter bindings the only argument is the
/// request itself, available through [`HandlerArgs::request`]. Otherwise
/// each bound (and validated) value sits at its declared index.
#[derive(Debug, Clone)]
pub struct HandlerArgs {
    request: Arc<RequestContext>,
    values: Option<Vec<Value>>,
}

impl HandlerArgs {
    pub fn new(request: Arc<RequestContext>, bound: BoundArgs) -> Self {
        let values = match bound {
            BoundArgs::Request => None,
            BoundArgs::Values(values) => Some(values),
        };
        Self { request, values }
    }

    /// The request this invocation belongs to.
    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    /// Whether any parameter bindings were applied.
    pub fn is_bound(&self) -> bool {
        self.values.is_some()
    }

    /// Number of positional arguments.
    pub fn len(&self) -> usize {
        self.values.as_ref().map_or(1, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw bound value at `index`.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.as_ref().and_then(|values| values.get(index))
    }

    /// Bound value at `index`, deserialized into `T`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, Error> {
        let value = self
            .value(index)
            .ok_or_else(|| Error::Argument(format!("no argument bound at index {}", index)))?;
        serde_json::from_value(value.clone())
            .map_err(|e| Error::Argument(format!("argument {}: {}", index, e)))
    }

    /// All bound values, in argument order.
    pub fn values(&self) -> &[Value] {
        self.values.as_deref().unwrap_or(&[])
    }
}

/// A route handler.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, args: HandlerArgs, response: ResponseSink) -> HandlerResult;
}

/// Handler backed by an async closure.
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(HandlerArgs, ResponseSink) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn call(&self, args: HandlerArgs, response: ResponseSink) -> HandlerResult {
        (self.f)(args, response).await
    }
}

/// Wrap an async closure as a shareable handler.
///
/// ```
/// use aqua_core::{handler_fn, HandlerArgs, ResponseSink};
///
/// let hello = handler_fn(|_args: HandlerArgs, _res: ResponseSink| async move {
///     Ok(Some(serde_json::json!({ "message": "hello" })))
/// });
/// # let _ = hello;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(HandlerArgs, ResponseSink) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(FnHandler::new(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct NewUser {
        name: String,
    }

    fn request() -> Arc<RequestContext> {
        Arc::new(RequestContext::new("GET", "/users/1"))
    }

    #[test]
    fn test_unbound_args_expose_request() {
        let args = HandlerArgs::new(request(), BoundArgs::Request);
        assert!(!args.is_bound());
        assert_eq!(args.len(), 1);
        assert_eq!(args.request().path, "/users/1");
        assert!(args.value(0).is_none());
    }

    #[test]
    fn test_typed_access() {
        let args = HandlerArgs::new(
            request(),
            BoundArgs::Values(vec![json!({"name": "Ann"}), json!(42.5)]),
        );
        assert_eq!(
            args.get::<NewUser>(0).unwrap(),
            NewUser { name: "Ann".into() }
        );
        assert_eq!(args.get::<f64>(1).unwrap(), 42.5);
        assert!(matches!(args.get::<String>(1), Err(Error::Argument(_))));
        assert!(matches!(args.get::<String>(5), Err(Error::Argument(_))));
    }

    #[tokio::test]
    async fn test_handler_fn() {
        let handler = handler_fn(|args: HandlerArgs, _res: ResponseSink| async move {
            Ok(Some(json!({ "path": args.request().path })))
        });
        let out = handler
            .call(HandlerArgs::new(request(), BoundArgs::Request), ResponseSink::new())
            .await
            .unwrap();
        assert_eq!(out, Some(json!({"path": "/users/1"})));
    }
}
