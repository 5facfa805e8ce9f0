// Middleware system for request processing

use crate::{Error, RequestContext, ResponseSink};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Boxed future returned by chain continuations
pub type ChainFuture = Pin<Box<dyn Future<Output = Result<(), Error>> + Send>>;

/// Type alias for the next step in the middleware chain.
///
/// Calling it runs the rest of the chain and, after the last middleware,
/// the handler path. Not calling it short-circuits the request.
pub type Next = Box<dyn FnOnce(RequestContext) -> ChainFuture + Send>;

/// Middleware trait for processing requests before they reach the handler
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Observe the request and either continue with `next` or write the
    /// response and return without calling it.
    async fn handle(&self, req: RequestContext, res: ResponseSink, next: Next)
    -> Result<(), Error>;
}

/// Ordered middleware list executed as a continuation chain
#[derive(Clone)]
pub struct MiddlewareChain {
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middlewares: Arc::new(Vec::new()),
        }
    }

    pub fn from_vec(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            middlewares: Arc::new(middlewares),
        }
    }

    /// Add a middleware to the chain
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.push(Arc::new(middleware));
    }

    /// Add an already shared middleware to the chain
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        Arc::make_mut(&mut self.middlewares).push(middleware);
    }

    /// This chain followed by `other`, each keeping its own order
    pub fn concat(&self, other: &[Arc<dyn Middleware>]) -> Self {
        let mut mws = (*self.middlewares).clone();
        mws.extend(other.iter().cloned());
        Self::from_vec(mws)
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Execute the chain, finishing with `terminal`
    pub async fn apply(&self, req: RequestContext, res: ResponseSink, terminal: Next) -> Result<(), Error> {
        debug!(
            middleware_count = self.middlewares.len(),
            path = %req.path,
            method = %req.method,
            "Executing middleware chain"
        );
        self.execute_from(0, req, res, terminal).await
    }

    fn execute_from(
        &self,
        index: usize,
        req: RequestContext,
        res: ResponseSink,
        terminal: Next,
    ) -> ChainFuture {
        if index >= self.middlewares.len() {
            trace!("Middleware chain complete, calling handler");
            terminal(req)
        } else {
            let middleware = self.middlewares[index].clone();
            let chain = self.clone();
            let next_res = res.clone();

            trace!(middleware_index = index, "Executing middleware");
            Box::pin(async move {
                middleware
                    .handle(
                        req,
                        res,
                        Box::new(move |req| chain.execute_from(index + 1, req, next_res, terminal)),
                    )
                    .await
            })
        }
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware backed by an async closure
pub struct FnMiddleware<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(RequestContext, ResponseSink, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    async fn handle(&self, req: RequestContext, res: ResponseSink, next: Next) -> Result<(), Error> {
        (self.f)(req, res, next).await
    }
}

/// Wrap an async closure as middleware.
///
/// ```
/// use aqua_core::{middleware_fn, Next, RequestContext, ResponseSink};
///
/// let timing = middleware_fn(|req: RequestContext, res: ResponseSink, next: Next| async move {
///     res.header("X-Handled-By", "aqua");
///     next(req).await
/// });
/// # let _ = timing;
/// ```
pub fn middleware_fn<F, Fut>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(RequestContext, ResponseSink, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    Arc::new(FnMiddleware { f })
}

// ========== Built-in Middleware ==========

/// Logs one line per request and one per completed response
pub struct LoggerMiddleware {
    pub log_body: bool,
}

impl LoggerMiddleware {
    pub fn new() -> Self {
        Self { log_body: false }
    }

    pub fn with_body(mut self) -> Self {
        self.log_body = true;
        self
    }
}

impl Default for LoggerMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for LoggerMiddleware {
    async fn handle(&self, req: RequestContext, res: ResponseSink, next: Next) -> Result<(), Error> {
        let start = std::time::Instant::now();
        let method = req.method.clone();
        let path = req.path.clone();

        if self.log_body {
            info!(method = %method, path = %path, body = %req.body, "→ request");
        } else {
            info!(method = %method, path = %path, "→ request");
        }

        let result = next(req).await;
        let duration = start.elapsed();

        match &result {
            Ok(()) => info!(
                method = %method,
                path = %path,
                status = res.status_code(),
                duration_ms = duration.as_millis() as u64,
                "← response"
            ),
            Err(e) => info!(
                method = %method,
                path = %path,
                error = %e,
                duration_ms = duration.as_millis() as u64,
                "← failed"
            ),
        }

        result
    }
}

/// Propagates or generates an `x-request-id` on request and response
pub struct RequestIdMiddleware;

#[async_trait]
impl Middleware for RequestIdMiddleware {
    async fn handle(&self, mut req: RequestContext, res: ResponseSink, next: Next) -> Result<(), Error> {
        let request_id = req
            .headers
            .get("x-request-id")
            .cloned()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        req.headers
            .insert("x-request-id".to_string(), request_id.clone());
        res.header("x-request-id", request_id);

        next(req).await
    }
}

/// CORS (Cross-Origin Resource Sharing) middleware
pub struct CorsMiddleware {
    pub allow_origin: String,
    pub allow_methods: String,
    pub allow_headers: String,
    pub allow_credentials: bool,
    pub max_age: u32,
}

impl CorsMiddleware {
    pub fn new() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: "GET, POST, PUT, DELETE, OPTIONS, PATCH, HEAD".to_string(),
            allow_headers: "Content-Type, Authorization, Accept".to_string(),
            allow_credentials: false,
            max_age: 86400, // 24 hours
        }
    }

    pub fn allow_origin(mut self, origin: &str) -> Self {
        self.allow_origin = origin.to_string();
        self
    }

    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for CorsMiddleware {
    async fn handle(&self, req: RequestContext, res: ResponseSink, next: Next) -> Result<(), Error> {
        res.header("Access-Control-Allow-Origin", self.allow_origin.as_str());
        if self.allow_credentials {
            res.header("Access-Control-Allow-Credentials", "true");
        }

        // Preflight requests are answered here
        if req.method.eq_ignore_ascii_case("OPTIONS") {
            res.header("Access-Control-Allow-Methods", self.allow_methods.as_str())
                .header("Access-Control-Allow-Headers", self.allow_headers.as_str())
                .header("Access-Control-Max-Age", self.max_age.to_string())
                .status(204);
            return res.send(Vec::new());
        }

        next(req).await
    }
}
