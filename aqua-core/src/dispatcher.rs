// Request dispatch: match -> bind -> middleware -> interceptors -> handler

use crate::{
    bind, register_controller, ChainFuture, Controller, Error, HandlerArgs, HttpResponse,
    Interceptor, InterceptorChain, InterceptorContext, Middleware, Next, RequestContext,
    ResponseSink, RouteTable, STATUS_INTERNAL_SERVER_ERROR,
};
use futures_util::FutureExt;
use parking_lot::RwLock;
use serde_json::json;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Drives one request through the registered routes.
///
/// Every failure is turned into a response here; nothing a handler does
/// reaches the transport as an error.
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    interceptors: RwLock<Vec<Arc<dyn Interceptor>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_routes(Arc::new(RouteTable::new()))
    }

    pub fn with_routes(routes: Arc<RouteTable>) -> Self {
        Self {
            routes,
            interceptors: RwLock::new(Vec::new()),
        }
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    /// Add global middleware for routes registered from now on.
    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.routes.use_middleware(middleware);
    }

    /// Add a global interceptor; runs before class and method interceptors.
    pub fn use_interceptor(&self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.write().push(interceptor);
    }

    pub fn register_controller(&self, controller: &dyn Controller) -> Result<usize, Error> {
        register_controller(&self.routes, controller)
    }

    /// Dispatch `req`, writing the outcome to `res`.
    ///
    /// A panic in middleware, an interceptor or the handler is caught and
    /// answered like any other handler failure.
    pub async fn dispatch(&self, req: RequestContext, res: ResponseSink) {
        match AssertUnwindSafe(self.run(req, res.clone())).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => write_error(&err, &res),
            Err(panic) => {
                let err = Error::Internal(format!("handler panicked: {}", panic_message(panic.as_ref())));
                write_error(&err, &res);
            }
        }
    }

    /// Dispatch into a fresh response and snapshot it.
    ///
    /// A response nobody wrote becomes a 500, since the pipeline finished
    /// without producing an answer.
    pub async fn handle(&self, req: RequestContext) -> HttpResponse {
        let method = req.method.clone();
        let path = req.path.clone();
        let res = ResponseSink::new();
        self.dispatch(req, res.clone()).await;

        if !res.headers_sent() {
            warn!(
                method = %method,
                path = %path,
                status = res.status_code(),
                "Request finished without a response being written"
            );
            let body = json!({ "error": "Internal Server Error" });
            if let Err(e) = res.status(STATUS_INTERNAL_SERVER_ERROR).json(&body) {
                warn!(error = %e, "Failed to write fallback response");
            }
        }
        res.to_response()
    }

    async fn run(&self, mut req: RequestContext, res: ResponseSink) -> Result<(), Error> {
        let matched = self
            .routes
            .match_route(&req.method, &req.path)
            .ok_or_else(|| Error::RouteNotFound(format!("{} {}", req.method, req.path)))?;

        let route = matched.route;
        req.path_params = matched.params;
        debug!(
            method = %req.method,
            path = %req.path,
            route = %route.path,
            handler = %route.endpoint.handler_name,
            "Matched route"
        );

        let bound = bind(&route.endpoint.bindings, &req)?;

        let chain = {
            let global = self.interceptors.read();
            InterceptorChain::effective(&global, &route.endpoint.interceptors)
        };
        let endpoint = route.endpoint.clone();
        let handler_res = res.clone();

        let terminal: Next = Box::new(move |req: RequestContext| -> ChainFuture {
            Box::pin(async move {
                let request = Arc::new(req);
                let context = InterceptorContext {
                    args: HandlerArgs::new(request.clone(), bound),
                    request,
                    response: handler_res.clone(),
                    handler: endpoint.handler.clone(),
                    handler_name: endpoint.handler_name.clone(),
                };

                if let Some(data) = chain.execute(context).await? {
                    if !handler_res.headers_sent() {
                        handler_res.json(&data)?;
                    }
                }
                Ok(())
            })
        });

        route.middleware.apply(req, res, terminal).await
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Map a dispatch failure onto the response, unless one was already sent.
fn write_error(err: &Error, res: &ResponseSink) {
    let (status, body) = match err {
        Error::RouteNotFound(target) => {
            debug!(target = %target, "No route matched");
            (err.status_code(), json!({ "error": "Not Found" }))
        }
        Error::Validation(validation) => {
            debug!(errors = validation.errors.len(), "Parameter validation failed");
            (err.status_code(), validation.to_json())
        }
        other => {
            error!(error = %other, "Request error");
            (err.status_code(), json!({ "error": "Internal Server Error" }))
        }
    };

    if res.headers_sent() {
        return;
    }
    if let Err(e) = res.status(status).json(&body) {
        warn!(error = %e, "Failed to write error response");
    }
}
