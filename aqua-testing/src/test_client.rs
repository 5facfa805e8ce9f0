// In-process test client

use aqua_core::{Application, Dispatcher, Error, HttpMethod, HttpResponse, RequestContext};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Drives requests through a [`Dispatcher`] without opening a socket.
///
/// Requests go through the same decoding the HTTP transport applies, so
/// bodies that are not JSON arrive as strings and empty bodies as `{}`.
#[derive(Clone)]
pub struct TestClient {
    dispatcher: Arc<Dispatcher>,
}

impl TestClient {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn for_app(app: &Application) -> Self {
        Self::new(app.dispatcher())
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(TestRequestBuilder::new(HttpMethod::GET, path)).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.send(TestRequestBuilder::new(HttpMethod::DELETE, path)).await
    }

    /// POST a raw body
    pub async fn post(&self, path: &str, body: impl Into<Vec<u8>>) -> TestResponse {
        self.send(TestRequestBuilder::new(HttpMethod::POST, path).body(body))
            .await
    }

    pub async fn post_json<T: Serialize + ?Sized>(&self, path: &str, data: &T) -> TestResponse {
        self.send_json(HttpMethod::POST, path, data).await
    }

    pub async fn put_json<T: Serialize + ?Sized>(&self, path: &str, data: &T) -> TestResponse {
        self.send_json(HttpMethod::PUT, path, data).await
    }

    pub async fn patch_json<T: Serialize + ?Sized>(&self, path: &str, data: &T) -> TestResponse {
        self.send_json(HttpMethod::PATCH, path, data).await
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        data: &T,
    ) -> TestResponse {
        match TestRequestBuilder::new(method, path).json(data) {
            Ok(request) => self.send(request).await,
            Err(e) => panic!("Failed to serialize request body: {}", e),
        }
    }

    /// Dispatch a built request
    pub async fn send(&self, request: TestRequestBuilder) -> TestResponse {
        TestResponse::new(self.dispatcher.handle(request.build()).await)
    }
}

/// Builder for test requests
pub struct TestRequestBuilder {
    method: HttpMethod,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    query: Vec<(String, String)>,
}

impl TestRequestBuilder {
    pub fn new(method: HttpMethod, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
            body: Vec::new(),
            query: Vec::new(),
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and content type
    pub fn json<T: Serialize + ?Sized>(mut self, data: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(data)?;
        Ok(self.header("Content-Type", "application/json"))
    }

    /// Append a query parameter; repeat a key to send a list.
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn build(self) -> RequestContext {
        let mut url = self.path;
        if !self.query.is_empty() {
            let encoded = serde_urlencoded::to_string(&self.query).unwrap_or_default();
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&encoded);
        }

        self.headers.into_iter().fold(
            RequestContext::new(self.method.as_str(), url).with_raw_body(&self.body),
            |req, (key, value)| req.with_header(key, value),
        )
    }
}

/// Response from a test request
#[derive(Debug, Clone)]
pub struct TestResponse {
    response: HttpResponse,
}

impl TestResponse {
    pub fn new(response: HttpResponse) -> Self {
        Self { response }
    }

    pub fn status(&self) -> u16 {
        self.response.status
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, key: &str) -> Option<&str> {
        self.response.header(key)
    }

    pub fn body(&self) -> &[u8] {
        &self.response.body
    }

    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.response.body.clone()).ok()
    }

    /// Body as a JSON value; panics if the body is not JSON.
    pub fn json(&self) -> Value {
        match self.response.json() {
            Ok(value) => value,
            Err(e) => panic!(
                "Response body is not JSON ({}): {:?}",
                e,
                self.body_string()
            ),
        }
    }

    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_slice(&self.response.body)?)
    }

    pub fn into_inner(self) -> HttpResponse {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = TestRequestBuilder::new(HttpMethod::GET, "/test")
            .header("Authorization", "Bearer token")
            .query("q", "a b")
            .query("tag", "x")
            .query("tag", "y")
            .build();

        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/test");
        assert_eq!(req.query("q"), Some("a b"));
        assert_eq!(
            req.query_value()["tag"],
            serde_json::json!(["x", "y"])
        );
        assert_eq!(req.header("authorization").map(String::as_str), Some("Bearer token"));
    }

    #[test]
    fn test_body_decoding() {
        let req = TestRequestBuilder::new(HttpMethod::POST, "/")
            .json(&serde_json::json!({"a": 1}))
            .unwrap()
            .build();
        assert_eq!(req.body, serde_json::json!({"a": 1}));
        assert_eq!(req.header("content-type").map(String::as_str), Some("application/json"));

        let req = TestRequestBuilder::new(HttpMethod::POST, "/").body("not json").build();
        assert_eq!(req.body, serde_json::json!("not json"));

        let req = TestRequestBuilder::new(HttpMethod::POST, "/").build();
        assert_eq!(req.body, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let client = TestClient::new(Arc::new(Dispatcher::new()));
        let response = client.get("/missing").await;
        assert_eq!(response.status(), 404);
        assert_eq!(response.json(), serde_json::json!({"error": "Not Found"}));
    }

    fn echo_client() -> TestClient {
        use aqua_core::{ControllerBuilder, HandlerArgs, ResponseSink, handler_fn};

        let echo = handler_fn(|args: HandlerArgs, _res: ResponseSink| async move {
            let req = args.request();
            Ok(Some(serde_json::json!({ "method": req.method, "body": req.body })))
        });
        let controller = ControllerBuilder::new("EchoController")
            .declare()
            .put("/echo", "echo")
            .patch("/echo", "echo")
            .handler("echo", echo)
            .build();

        let dispatcher = Dispatcher::new();
        dispatcher.register_controller(&controller).unwrap();
        TestClient::new(Arc::new(dispatcher))
    }

    #[derive(Debug, serde::Deserialize)]
    struct Echoed {
        method: String,
        body: Value,
    }

    #[tokio::test]
    async fn test_put_and_patch_json() {
        let client = echo_client();

        let echoed: Echoed = client
            .put_json("/echo", &serde_json::json!({"name": "Ann"}))
            .await
            .body_json()
            .unwrap();
        assert_eq!(echoed.method, "PUT");
        assert_eq!(echoed.body, serde_json::json!({"name": "Ann"}));

        let echoed: Echoed = client
            .patch_json("/echo", &serde_json::json!({"active": false}))
            .await
            .body_json()
            .unwrap();
        assert_eq!(echoed.method, "PATCH");
        assert_eq!(echoed.body, serde_json::json!({"active": false}));
    }

    #[tokio::test]
    async fn test_into_inner() {
        let response = echo_client().get("/echo").await;
        assert!(response.body_json::<Echoed>().is_err());

        let inner = response.into_inner();
        assert_eq!(inner.status, 404);
        assert_eq!(inner.header("content-type"), Some("application/json"));
    }
}
