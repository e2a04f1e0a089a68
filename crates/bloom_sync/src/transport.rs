//! Transport layer abstraction for API calls.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// HTTP methods used by the bloom API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET.
    Get,
    /// POST.
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// A fully built request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Returns the value of a header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the path and query part of the URL.
    pub fn path(&self) -> &str {
        path_of(&self.url)
    }
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// `Content-Type` header, if sent.
    pub content_type: Option<String>,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A response with a JSON body.
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".into()),
            body: body.to_string().into_bytes(),
        }
    }

    /// A plain-text response.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: Some("text/html; charset=utf-8".into()),
            body: body.into().into_bytes(),
        }
    }

    /// A response with no body and no content type.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: Vec::new(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true if the response declares a JSON body.
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual network transport. An `Err`
/// means the call never completed; any status, including errors, is `Ok`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// Strips scheme and authority from an absolute URL.
pub(crate) fn path_of(url: &str) -> &str {
    match url.find("://") {
        Some(i) => {
            let rest = &url[i + 3..];
            rest.find('/').map(|j| &rest[j..]).unwrap_or("/")
        }
        None => url,
    }
}

/// A scripted reply for [`MockHttpClient`].
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with this response.
    Response(HttpResponse),
    /// Fail as if the network dropped.
    Unreachable(String),
}

/// A mock HTTP client for testing.
///
/// Replies are scripted per `"METHOD /path"`. Queued replies are consumed in
/// order and the last one keeps answering. Unscripted routes get a 404.
#[derive(Debug, Default)]
pub struct MockHttpClient {
    routes: Mutex<HashMap<String, VecDeque<MockReply>>>,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockHttpClient {
    /// Creates a new mock client with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for `method path`.
    pub fn reply(&self, method: Method, path: &str, reply: MockReply) {
        self.routes
            .lock()
            .entry(route_key(method, path))
            .or_default()
            .push_back(reply);
    }

    /// Queues a JSON reply.
    pub fn reply_json(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        self.reply(method, path, MockReply::Response(HttpResponse::json(status, body)));
    }

    /// Queues a transport failure.
    pub fn reply_unreachable(&self, method: Method, path: &str) {
        self.reply(
            method,
            path,
            MockReply::Unreachable("connection refused".into()),
        );
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Returns all requests in the order they were issued.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Returns the `"METHOD /path"` of every request, in issue order.
    pub fn calls(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| route_key(r.method, r.path()))
            .collect()
    }

    /// Counts requests to `method path`.
    pub fn count(&self, method: Method, path: &str) -> usize {
        let key = route_key(method, path);
        self.calls().iter().filter(|c| **c == key).count()
    }

    /// Highest number of calls that were outstanding at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, key: &str) -> Option<MockReply> {
        let mut routes = self.routes.lock();
        let queue = routes.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let key = route_key(request.method, request.path());
        self.requests.lock().push(request);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        // Suspend once so that sibling calls joined with this one get polled.
        let latency = *self.latency.lock();
        match latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.next_reply(&key) {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Unreachable(message)) => Err(message),
            None => Ok(HttpResponse::json(
                404,
                serde_json::json!({ "message": format!("no mock route for {}", key) }),
            )),
        }
    }
}

fn route_key(method: Method, path: &str) -> String {
    format!("{} {}", method, path)
}
