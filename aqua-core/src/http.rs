// HTTP request and response types

use crate::Error;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A single query-string entry. Repeated keys collect into `Multi`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multi(Vec<String>),
}

impl QueryValue {
    /// First (or only) value.
    pub fn first(&self) -> Option<&str> {
        match self {
            QueryValue::Single(v) => Some(v),
            QueryValue::Multi(vs) => vs.first().map(String::as_str),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            QueryValue::Single(v) => Value::String(v.clone()),
            QueryValue::Multi(vs) => Value::Array(vs.iter().cloned().map(Value::String).collect()),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = QueryValue::Multi(vec![first, value]);
            }
            QueryValue::Multi(vs) => vs.push(value),
        }
    }
}

/// Per-request descriptor handed to the dispatcher by the transport.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: String,
    /// Full request target, including any query string
    pub url: String,
    pub path: String,
    pub query: BTreeMap<String, QueryValue>,
    pub path_params: HashMap<String, String>,
    pub body: Value,
    pub headers: HashMap<String, String>,
}

impl RequestContext {
    /// Build a context from a method and request target (`/path?query`).
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path.to_string(), parse_query_string(query)),
            None => (url.clone(), BTreeMap::new()),
        };
        let path = if path.is_empty() { "/".to_string() } else { path };

        Self {
            method: method.into(),
            url,
            path,
            query,
            path_params: HashMap::new(),
            body: Value::Object(Default::default()),
            headers: HashMap::new(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Set the body from raw bytes using the transport decoding rules.
    pub fn with_raw_body(mut self, bytes: &[u8]) -> Self {
        self.body = decode_body(bytes);
        self
    }

    /// Add a header. Names are stored lower-cased.
    pub fn with_header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Get a path parameter by name
    pub fn param(&self, name: &str) -> Option<&String> {
        self.path_params.get(name)
    }

    /// Get a query parameter by name (first value if repeated)
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).and_then(QueryValue::first)
    }

    /// Get a header by (case-insensitive) name
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_ascii_lowercase())
    }

    /// Path parameters as a JSON object
    pub fn params_value(&self) -> Value {
        Value::Object(
            self.path_params
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }

    /// Query mapping as a JSON object
    pub fn query_value(&self) -> Value {
        Value::Object(
            self.query
                .iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }
}

/// Parse a query string into a map of parameters.
///
/// Values are percent-decoded; a key seen more than once becomes a list.
pub fn parse_query_string(query: &str) -> BTreeMap<String, QueryValue> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();
    let mut params: BTreeMap<String, QueryValue> = BTreeMap::new();
    for (key, value) in pairs {
        match params.get_mut(&key) {
            Some(existing) => existing.push(value),
            None => {
                params.insert(key, QueryValue::Single(value));
            }
        }
    }
    params
}

/// Decode a request body: JSON when it parses, the raw text when it does
/// not, and an empty object when there is no body.
pub fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Finished HTTP response, as handed back to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parse the body as JSON
    pub fn json(&self) -> Result<Value, Error> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[derive(Debug)]
struct ResponseState {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    sent: bool,
}

/// Write handle for a single response.
///
/// Cloning yields another handle to the same response, so middleware,
/// interceptors and the handler all write to one place. Once `json` or
/// `send` has run the response is ended and further writes are rejected
/// with [`Error::HeadersAlreadySent`].
#[derive(Debug, Clone)]
pub struct ResponseSink {
    inner: Arc<Mutex<ResponseState>>,
}

impl ResponseSink {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ResponseState {
                status: 200,
                headers: Vec::new(),
                body: Vec::new(),
                sent: false,
            })),
        }
    }

    /// Set the status code. Ignored once the response has been sent.
    pub fn status(&self, code: u16) -> &Self {
        let mut state = self.inner.lock();
        if !state.sent {
            state.status = code;
        }
        self
    }

    /// Set a header, replacing any previous value. Ignored once sent.
    pub fn header(&self, key: impl Into<String>, value: impl Into<String>) -> &Self {
        let key = key.into();
        let value = value.into();
        let mut state = self.inner.lock();
        if !state.sent {
            match state
                .headers
                .iter_mut()
                .find(|(k, _)| k.eq_ignore_ascii_case(&key))
            {
                Some(entry) => entry.1 = value,
                None => state.headers.push((key, value)),
            }
        }
        self
    }

    /// Serialize `data` as the JSON body and end the response.
    pub fn json<T: Serialize + ?Sized>(&self, data: &T) -> Result<(), Error> {
        let body = serde_json::to_vec(data)?;
        self.header("Content-Type", "application/json");
        self.end(body)
    }

    /// Write a raw body and end the response.
    pub fn send(&self, data: impl Into<Vec<u8>>) -> Result<(), Error> {
        self.end(data.into())
    }

    fn end(&self, body: Vec<u8>) -> Result<(), Error> {
        let mut state = self.inner.lock();
        if state.sent {
            return Err(Error::HeadersAlreadySent);
        }
        state.body = body;
        state.sent = true;
        Ok(())
    }

    /// Whether the response has been written.
    pub fn headers_sent(&self) -> bool {
        self.inner.lock().sent
    }

    pub fn status_code(&self) -> u16 {
        self.inner.lock().status
    }

    /// Snapshot the response for the transport.
    pub fn to_response(&self) -> HttpResponse {
        let state = self.inner.lock();
        HttpResponse {
            status: state.status,
            headers: state.headers.clone(),
            body: state.body.clone(),
        }
    }
}

impl Default for ResponseSink {
    fn default() -> Self {
        Self::new()
    }
}
