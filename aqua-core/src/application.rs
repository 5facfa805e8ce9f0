// Application bootstrapper and HTTP server

use crate::{Controller, Dispatcher, Error, HttpResponse, Interceptor, Middleware, RequestContext};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Default cap on request body size (1 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Server construction options
#[derive(Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
    /// Largest request body accepted, in bytes
    pub body_limit: usize,
    /// Installed as global middleware when the application is created
    pub middleware: Vec<Arc<dyn Middleware>>,
}

impl ServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3000,
            body_limit: DEFAULT_BODY_LIMIT,
            middleware: Vec::new(),
        }
    }
}

impl std::fmt::Debug for ServerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("body_limit", &self.body_limit)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// The main application struct
pub struct Application {
    options: ServerOptions,
    dispatcher: Arc<Dispatcher>,
}

impl Application {
    pub fn new(options: ServerOptions) -> Self {
        let dispatcher = Dispatcher::new();
        for middleware in &options.middleware {
            dispatcher.use_middleware(middleware.clone());
        }
        Self {
            options,
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Register a controller. Must happen before [`listen`](Self::listen).
    pub fn register_controller(&self, controller: &dyn Controller) -> Result<usize, Error> {
        self.dispatcher.register_controller(controller)
    }

    /// Add global middleware for controllers registered afterwards.
    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.dispatcher.use_middleware(middleware);
    }

    pub fn use_interceptor(&self, interceptor: Arc<dyn Interceptor>) {
        self.dispatcher.use_interceptor(interceptor);
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    /// Bind the listening socket without serving yet.
    pub async fn bind(self) -> Result<BoundApplication, Error> {
        let address = self.options.address();
        let listener = TcpListener::bind(&address).await?;
        info!(address = %address, "Listening");
        Ok(BoundApplication {
            listener,
            dispatcher: self.dispatcher,
            body_limit: self.options.body_limit,
        })
    }

    /// Start the HTTP server and serve until the process exits.
    pub async fn listen(self) -> Result<(), Error> {
        self.bind().await?.serve().await
    }

    /// Start the HTTP server and stop accepting once `signal` resolves.
    pub async fn listen_with_shutdown<F>(self, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        self.bind().await?.serve_with_shutdown(signal).await
    }
}

/// An application with a bound socket
pub struct BoundApplication {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    body_limit: usize,
}

impl BoundApplication {
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn serve(self) -> Result<(), Error> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Accept connections until `signal` resolves. Connections already
    /// accepted keep running on their own tasks.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(signal);

        loop {
            tokio::select! {
                _ = &mut signal => {
                    info!("Shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };
                    debug!(peer = %peer, "Accepted connection");

                    let io = TokioIo::new(stream);
                    let dispatcher = self.dispatcher.clone();
                    let body_limit = self.body_limit;

                    tokio::spawn(async move {
                        let service = service_fn(move |req: Request<IncomingBody>| {
                            let dispatcher = dispatcher.clone();
                            async move { handle_request(req, dispatcher, body_limit).await }
                        });

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                            error!(error = ?err, "Error serving connection");
                        }
                    });
                }
            }
        }
    }
}

/// Handle an incoming HTTP request
async fn handle_request(
    req: Request<IncomingBody>,
    dispatcher: Arc<Dispatcher>,
    body_limit: usize,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().as_str().to_string();
    let url = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let mut headers = HashMap::new();
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            headers.insert(name.as_str().to_string(), value.to_string());
        }
    }

    let body = match Limited::new(req.into_body(), body_limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            debug!(limit = body_limit, "Request body over limit");
            return Ok(error_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large"));
        }
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            return Ok(error_response(StatusCode::BAD_REQUEST, "Bad Request"));
        }
    };

    let mut context = RequestContext::new(method, url).with_raw_body(&body);
    context.headers = headers;

    let response = dispatcher.handle(context).await;
    Ok(into_hyper(response))
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    into_hyper(HttpResponse {
        status: status.as_u16(),
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        body: serde_json::json!({ "error": message }).to_string().into_bytes(),
    })
}

fn into_hyper(response: HttpResponse) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(response.status);
    for (key, value) in &response.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    match builder.body(Full::new(Bytes::from(response.body))) {
        Ok(response) => response,
        Err(e) => {
            let err = Error::Http(e.to_string());
            error!(error = %err, status = response.status, "Invalid response");
            let mut fallback = Response::new(Full::new(Bytes::new()));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ControllerBuilder, HandlerArgs, ResponseSink, handler_fn};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_default_options() {
        let options = ServerOptions::default();
        assert_eq!(options.host, "localhost");
        assert_eq!(options.port, 3000);
        assert_eq!(options.address(), "localhost:3000");
        assert_eq!(options.body_limit, DEFAULT_BODY_LIMIT);
        assert_eq!(ServerOptions::new().body_limit(16).body_limit, 16);
    }

    #[test]
    fn test_invalid_header_falls_back_to_500() {
        let response = into_hyper(HttpResponse {
            status: 200,
            headers: vec![("bad header".to_string(), "x".to_string())],
            body: Vec::new(),
        });
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_serves_over_tcp() {
        let app = Application::new(ServerOptions::new().host("127.0.0.1").port(0));
        app.register_controller(
            &ControllerBuilder::new("Echo")
                .declare()
                .post("/echo", "echo")
                .handler(
                    "echo",
                    handler_fn(|args: HandlerArgs, _res: ResponseSink| async move {
                        Ok(Some(args.request().body.clone()))
                    }),
                )
                .build(),
        )
        .unwrap();

        let bound = app.bind().await.unwrap();
        let addr = bound.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(bound.serve_with_shutdown(async {
            let _ = rx.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let body = r#"{"a":1}"#;
        let request = format!(
            "POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        assert!(raw.starts_with("HTTP/1.1 200 OK"));
        assert!(raw.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(raw.ends_with(r#"{"a":1}"#));

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let app = Application::new(ServerOptions::new().host("127.0.0.1").port(0).body_limit(8));
        app.register_controller(
            &ControllerBuilder::new("Echo")
                .declare()
                .post("/echo", "echo")
                .handler(
                    "echo",
                    handler_fn(|args: HandlerArgs, _res: ResponseSink| async move {
                        Ok(Some(args.request().body.clone()))
                    }),
                )
                .build(),
        )
        .unwrap();

        let bound = app.bind().await.unwrap();
        let addr = bound.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(bound.serve_with_shutdown(async {
            let _ = rx.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let body = r#"{"name":"far too long"}"#;
        let request = format!(
            "POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        assert!(raw.starts_with("HTTP/1.1 413 Payload Too Large"));
        assert!(raw.ends_with(r#"{"error":"Payload Too Large"}"#));

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
