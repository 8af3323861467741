//! HTTP transport seam.
//!
//! The session client never talks to `reqwest` directly; it hands a fully
//! built `OutboundRequest` to a `Transport` and gets back the status and
//! raw body. This keeps the refresh/retry pipeline testable without a
//! network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use tracing::debug;

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: header::HeaderMap,
    pub body: Option<serde_json::Value>,
    pub timeout: Option<Duration>,
    /// Set once the request has been through a refresh-and-retry cycle
    pub retried: bool,
}

impl OutboundRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: header::HeaderMap::new(),
            body: None,
            timeout: None,
            retried: false,
        }
    }

    /// Replace the bearer token, or drop the header when there is none
    pub fn set_bearer(&mut self, token: Option<&str>) -> Result<(), ApiError> {
        self.headers.remove(header::AUTHORIZATION);
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidRequest("Access token is not a valid header value".to_string()))?;
            self.headers.insert(header::AUTHORIZATION, value);
        }
        Ok(())
    }

    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. Only transport-level failures are errors here;
    /// every HTTP status comes back as a `RawResponse`.
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, ApiError>;
}

/// `Transport` backed by a pooled `reqwest::Client`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, ApiError> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .header(header::ACCEPT, "application/json")
            .headers(request.headers.clone());

        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        debug!(method = %request.method, url = %request.url, status = status.as_u16(), "HTTP response");
        Ok(RawResponse { status, body })
    }
}

/// Scripted transport for tests: canned responses per route, and a log of
/// every request it saw.
#[cfg(test)]
pub(crate) mod mock {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use super::*;

    type Script = VecDeque<Result<RawResponse, ApiError>>;

    #[derive(Default)]
    pub struct MockTransport {
        routes: Mutex<HashMap<(Method, String), Script>>,
        requests: Mutex<Vec<OutboundRequest>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response for `method path`; responses are served in order
        pub fn respond(self, method: Method, path: &str, status: u16, body: &str) -> Self {
            let status = StatusCode::from_u16(status).expect("valid status code");
            self.push(method, path, Ok(RawResponse::new(status, body)));
            self
        }

        pub fn fail(self, method: Method, path: &str, error: ApiError) -> Self {
            self.push(method, path, Err(error));
            self
        }

        fn push(&self, method: Method, path: &str, response: Result<RawResponse, ApiError>) {
            self.routes
                .lock()
                .unwrap()
                .entry((method, path.to_string()))
                .or_default()
                .push_back(response);
        }

        pub fn requests(&self) -> Vec<OutboundRequest> {
            self.requests.lock().unwrap().clone()
        }

        /// Requests whose URL ends with `path`
        pub fn requests_to(&self, path: &str) -> Vec<OutboundRequest> {
            self.requests()
                .into_iter()
                .filter(|r| r.url.ends_with(path))
                .collect()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, ApiError> {
            self.requests.lock().unwrap().push(request.clone());

            let response = {
                let mut routes = self.routes.lock().unwrap();
                // Most specific route wins: "/student/enrolled/" over "/enrolled/"
                let script = routes
                    .iter_mut()
                    .filter(|((method, path), _)| *method == request.method && request.url.ends_with(path.as_str()))
                    .max_by_key(|((_, path), _)| path.len())
                    .map(|(_, script)| script);

                match script.and_then(|s| s.pop_front()) {
                    Some(response) => response,
                    None => panic!("no scripted response for {} {}", request.method, request.url),
                }
            };

            // Give other in-flight requests a turn, like a real round trip
            tokio::task::yield_now().await;
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_bearer_replaces_and_clears() {
        let mut request = OutboundRequest::new(Method::GET, "http://localhost/courses/");
        assert_eq!(request.bearer(), None);

        request.set_bearer(Some("A1")).unwrap();
        assert_eq!(request.bearer(), Some("A1"));

        request.set_bearer(Some("A2")).unwrap();
        assert_eq!(request.bearer(), Some("A2"));
        assert_eq!(request.headers.get_all(header::AUTHORIZATION).iter().count(), 1);

        request.set_bearer(None).unwrap();
        assert_eq!(request.bearer(), None);
    }

    #[test]
    fn test_set_bearer_ignores_empty_token() {
        let mut request = OutboundRequest::new(Method::GET, "http://localhost/courses/");
        request.set_bearer(Some("")).unwrap();
        assert!(request.headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_set_bearer_rejects_invalid_header() {
        let mut request = OutboundRequest::new(Method::GET, "http://localhost/courses/");
        assert!(request.set_bearer(Some("bad\ntoken")).is_err());
    }
}
