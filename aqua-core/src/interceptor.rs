// Interceptors: short-circuiting guards run around handler invocation

use crate::{Error, Handler, HandlerArgs, HandlerResult, RequestContext, ResponseSink};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything an interceptor can see about the pending handler call
#[derive(Clone)]
pub struct InterceptorContext {
    pub request: Arc<RequestContext>,
    pub response: ResponseSink,
    pub handler: Arc<dyn Handler>,
    pub handler_name: Arc<str>,
    pub args: HandlerArgs,
}

/// Verdict returned by an interceptor
#[derive(Debug, Clone, PartialEq)]
pub struct InterceptorResult {
    pub proceed: bool,
    /// Substitute result used when `proceed` is false
    pub data: Option<Value>,
}

impl InterceptorResult {
    /// Let the next interceptor (or the handler) run.
    pub fn proceed() -> Self {
        Self {
            proceed: true,
            data: None,
        }
    }

    /// Stop here. Use this when the interceptor wrote the response itself.
    pub fn halt() -> Self {
        Self {
            proceed: false,
            data: None,
        }
    }

    /// Stop here and answer with `data` instead of the handler's result.
    pub fn halt_with(data: Value) -> Self {
        Self {
            proceed: false,
            data: Some(data),
        }
    }
}

/// Interceptor trait
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self, context: &InterceptorContext) -> Result<InterceptorResult, Error>;
}

/// Interceptor backed by an async closure
pub struct FnInterceptor<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Interceptor for FnInterceptor<F>
where
    F: Fn(InterceptorContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<InterceptorResult, Error>> + Send + 'static,
{
    async fn intercept(&self, context: &InterceptorContext) -> Result<InterceptorResult, Error> {
        (self.f)(context.clone()).await
    }
}

/// Wrap an async closure as an interceptor
pub fn interceptor_fn<F, Fut>(f: F) -> Arc<dyn Interceptor>
where
    F: Fn(InterceptorContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<InterceptorResult, Error>> + Send + 'static,
{
    Arc::new(FnInterceptor { f })
}

/// Outcome of running the interceptors alone
#[derive(Debug, Clone, PartialEq)]
pub enum Intercepted {
    Proceed,
    Halted(Option<Value>),
}

/// Effective interceptor list for one call
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self { interceptors }
    }

    /// Global, then class-scoped, then method-scoped; no dedup.
    pub fn effective(
        global: &[Arc<dyn Interceptor>],
        scoped: &[Arc<dyn Interceptor>],
    ) -> Self {
        let mut interceptors = Vec::with_capacity(global.len() + scoped.len());
        interceptors.extend(global.iter().cloned());
        interceptors.extend(scoped.iter().cloned());
        Self { interceptors }
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Run interceptors in order, stopping at the first veto.
    pub async fn check(&self, context: &InterceptorContext) -> Result<Intercepted, Error> {
        for (index, interceptor) in self.interceptors.iter().enumerate() {
            let verdict = interceptor.intercept(context).await?;
            if !verdict.proceed {
                debug!(
                    interceptor_index = index,
                    handler = %context.handler_name,
                    "Interceptor halted dispatch"
                );
                return Ok(Intercepted::Halted(verdict.data));
            }
        }
        Ok(Intercepted::Proceed)
    }

    /// Run interceptors, then the handler if none vetoed.
    ///
    /// A veto's data becomes the result and the handler never runs.
    pub async fn execute(&self, context: InterceptorContext) -> HandlerResult {
        match self.check(&context).await? {
            Intercepted::Halted(data) => Ok(data),
            Intercepted::Proceed => context.handler.call(context.args, context.response).await,
        }
    }
}

// ========== Built-in Interceptors ==========

/// Logs every intercepted call
pub struct LoggingInterceptor;

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn intercept(&self, context: &InterceptorContext) -> Result<InterceptorResult, Error> {
        info!(
            method = %context.request.method,
            path = %context.request.path,
            handler = %context.handler_name,
            "Intercepted"
        );
        Ok(InterceptorResult::proceed())
    }
}

/// Rejects requests missing a header with `401 {"error":"Unauthorized"}`
pub struct HeaderGuardInterceptor {
    header: String,
}

impl HeaderGuardInterceptor {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }

    /// Guard on the `authorization` header
    pub fn authorization() -> Self {
        Self::new("authorization")
    }
}

#[async_trait]
impl Interceptor for HeaderGuardInterceptor {
    async fn intercept(&self, context: &InterceptorContext) -> Result<InterceptorResult, Error> {
        if context.request.header(&self.header).is_some() {
            return Ok(InterceptorResult::proceed());
        }
        context
            .response
            .status(401)
            .json(&serde_json::json!({ "error": "Unauthorized" }))?;
        Ok(InterceptorResult::halt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{handler_fn, BoundArgs};
    use parking_lot::Mutex;
    use serde_json::json;

    fn context(request: RequestContext, calls: Arc<Mutex<Vec<String>>>) -> InterceptorContext {
        let request = Arc::new(request);
        InterceptorContext {
            args: HandlerArgs::new(request.clone(), BoundArgs::Request),
            request,
            response: ResponseSink::new(),
            handler: handler_fn(move |_args: HandlerArgs, _res: ResponseSink| {
                let calls = calls.clone();
                async move {
                    calls.lock().push("handler".into());
                    Ok(Some(json!({"from": "handler"})))
                }
            }),
            handler_name: Arc::from("get_users"),
        }
    }

    fn recording(calls: Arc<Mutex<Vec<String>>>, name: &'static str) -> Arc<dyn Interceptor> {
        interceptor_fn(move |_ctx: InterceptorContext| {
            let calls = calls.clone();
            async move {
                calls.lock().push(name.into());
                Ok(InterceptorResult::proceed())
            }
        })
    }

    #[tokio::test]
    async fn test_all_proceed_runs_handler() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let chain = InterceptorChain::effective(
            &[recording(calls.clone(), "global")],
            &[recording(calls.clone(), "class"), recording(calls.clone(), "method")],
        );
        let result = chain
            .execute(context(RequestContext::new("GET", "/"), calls.clone()))
            .await
            .unwrap();

        assert_eq!(result, Some(json!({"from": "handler"})));
        assert_eq!(*calls.lock(), vec!["global", "class", "method", "handler"]);
    }

    #[tokio::test]
    async fn test_veto_substitutes_result() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let chain = InterceptorChain::new(vec![
            interceptor_fn(|_ctx: InterceptorContext| async move {
                Ok(InterceptorResult::halt_with(json!({"cached": true})))
            }),
            recording(calls.clone(), "never"),
        ]);
        let result = chain
            .execute(context(RequestContext::new("GET", "/"), calls.clone()))
            .await
            .unwrap();

        assert_eq!(result, Some(json!({"cached": true})));
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_header_guard() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let chain = InterceptorChain::new(vec![Arc::new(HeaderGuardInterceptor::authorization())]);

        let ctx = context(RequestContext::new("GET", "/"), calls.clone());
        let response = ctx.response.clone();
        assert_eq!(chain.execute(ctx).await.unwrap(), None);
        let out = response.to_response();
        assert_eq!(out.status, 401);
        assert_eq!(out.json().unwrap(), json!({"error": "Unauthorized"}));
        assert!(calls.lock().is_empty());

        let ctx = context(
            RequestContext::new("GET", "/").with_header("Authorization", "Bearer t"),
            calls.clone(),
        );
        assert!(chain.execute(ctx).await.unwrap().is_some());
        assert_eq!(*calls.lock(), vec!["handler"]);
    }

    #[tokio::test]
    async fn test_interceptor_error_propagates() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let chain = InterceptorChain::new(vec![interceptor_fn(|_ctx: InterceptorContext| async move {
            Err(Error::internal("interceptor failed"))
        })]);
        let result = chain
            .execute(context(RequestContext::new("GET", "/"), calls.clone()))
            .await;
        assert!(matches!(result, Err(Error::Internal(_))));
        assert!(calls.lock().is_empty());
    }
}
