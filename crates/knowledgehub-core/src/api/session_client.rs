//! Authenticated request pipeline.
//!
//! `SessionClient` attaches the current access token to every protected
//! request. A 401 moves the request into a single refresh-and-retry cycle:
//!
//! ```text
//! Sending ──2xx──▶ Done
//!    │ ──other──▶ Failed
//!    └──401──▶ Refreshing ──ok──▶ Retrying ──2xx──▶ Done
//!                  │                  └──any error──▶ Failed
//!                  └──error (session cleared)──▶ Failed
//! ```
//!
//! Concurrent requests that hit a 401 at the same time each run their own
//! refresh; refreshes are not coalesced.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::transport::{HttpTransport, OutboundRequest, RawResponse, Transport};
use super::ApiError;
use crate::auth::Session;
use crate::models::{Credentials, LoginResponse, RefreshRequest, RefreshResponse, UserProfile};

/// Default API root of a local development backend
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/v1";

const LOGIN_PATH: &str = "/auth/login/";
const REFRESH_PATH: &str = "/auth/token/refresh/";

/// Per-call knobs for `SessionClient::request`.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Attach `Authorization: Bearer <access token>` when a token is held
    pub authenticate: bool,
    /// Let a 401 start the refresh-and-retry cycle
    pub refresh_on_unauthorized: bool,
    pub headers: HeaderMap,
    /// Overrides the transport's default timeout
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            authenticate: true,
            refresh_on_unauthorized: true,
            headers: HeaderMap::new(),
            timeout: None,
        }
    }
}

impl RequestOptions {
    /// For endpoints that must be reached without credentials
    /// (registration, password reset).
    pub fn public() -> Self {
        Self {
            authenticate: false,
            refresh_on_unauthorized: false,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Sending,
    Refreshing,
    Retrying,
    Done,
    Failed,
}

impl RequestPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestPhase::Done | RequestPhase::Failed)
    }
}

/// HTTP client that keeps requests authenticated on behalf of its caller.
/// Clone is cheap; clones share the transport and the session.
#[derive(Clone)]
pub struct SessionClient {
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
    base_url: String,
}

impl SessionClient {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<Session>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            session,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Client over a real HTTP transport with the given default timeout
    pub fn with_http(session: Arc<Session>, base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let transport = HttpTransport::with_timeout(timeout)?;
        Ok(Self::new(Arc::new(transport), session, base_url))
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; paths are joined onto the base URL
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    // ===== Request pipeline =====

    /// Run one request through the pipeline and return the raw 2xx response.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        options: &RequestOptions,
    ) -> Result<RawResponse, ApiError> {
        self.execute_traced(method, path, body, options).await.0
    }

    /// Like `execute`, also returning every phase the request went through
    pub(crate) async fn execute_traced(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        options: &RequestOptions,
    ) -> (Result<RawResponse, ApiError>, Vec<RequestPhase>) {
        let mut request = OutboundRequest::new(method, self.url(path));
        request.headers = options.headers.clone();
        request.body = body;
        request.timeout = options.timeout;

        let pipeline = Pipeline {
            client: self,
            options,
            request,
            phase: RequestPhase::Sending,
            history: vec![RequestPhase::Sending],
            outcome: None,
        };
        pipeline.run().await
    }

    /// Send a request and decode the JSON body of the 2xx response.
    /// An empty body decodes as JSON `null`, so `T = ()` works for 204s.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        options: &RequestOptions,
    ) -> Result<T, ApiError> {
        let response = self.execute(method, path, body, options).await?;
        decode(&response, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None, &RequestOptions::default()).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(to_body(body)?), &RequestOptions::default())
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.request(Method::PUT, path, Some(to_body(body)?), &RequestOptions::default())
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.request(Method::PATCH, path, Some(to_body(body)?), &RequestOptions::default())
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, None, &RequestOptions::default()).await
    }

    /// One request straight to the transport: no token, no refresh cycle.
    /// Non-2xx statuses become errors.
    async fn send_direct(&self, method: Method, path: &str, body: serde_json::Value) -> Result<RawResponse, ApiError> {
        let mut request = OutboundRequest::new(method, self.url(path));
        request.body = Some(body);
        let response = self.transport.send(&request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_status(response.status, &response.body))
        }
    }

    // ===== Session lifecycle =====

    /// Exchange the refresh token for a new access token.
    ///
    /// Any failure, including holding no refresh token at all, clears the
    /// session and returns `ApiError::Unauthenticated`.
    pub async fn refresh(&self) -> Result<String, ApiError> {
        let Some(refresh_token) = self.session.refresh_token() else {
            warn!("No refresh token found, logging out");
            self.session.clear();
            return Err(ApiError::Unauthenticated);
        };

        let body = to_body(&RefreshRequest {
            refresh: &refresh_token,
        })?;
        let result = match self.send_direct(Method::POST, REFRESH_PATH, body).await {
            Ok(response) => decode::<RefreshResponse>(&response, REFRESH_PATH),
            Err(e) => Err(e),
        };

        match result {
            Ok(refreshed) if !refreshed.access.is_empty() => {
                self.session.set_access_token(&refreshed.access);
                if let Some(rotated) = refreshed.refresh.filter(|r| !r.is_empty()) {
                    self.session.set_refresh_token(&rotated);
                }
                info!("Access token refreshed");
                Ok(refreshed.access)
            }
            Ok(_) => {
                warn!("Refresh response carried an empty access token, logging out");
                self.session.clear();
                Err(ApiError::Unauthenticated)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, logging out");
                self.session.clear();
                Err(ApiError::Unauthenticated)
            }
        }
    }

    /// Log in, store both tokens and the user, then backfill the profile.
    ///
    /// The session is untouched when the login call fails. A failing
    /// profile fetch afterwards is logged and the login still succeeds with
    /// the user record from the login response, unless the fetch ended the
    /// session.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, ApiError> {
        info!(username = %credentials.username, "Logging in");

        let response = self
            .send_direct(Method::POST, LOGIN_PATH, to_body(credentials)?)
            .await?;
        let login: LoginResponse = decode(&response, LOGIN_PATH)?;

        let access = login.access.filter(|t| !t.is_empty());
        let refresh = login.refresh.filter(|t| !t.is_empty());
        let (Some(access), Some(refresh)) = (access, refresh) else {
            warn!("Login response did not include both tokens");
            return Err(ApiError::InvalidResponse(
                "Login failed: no tokens received".to_string(),
            ));
        };

        let user = login.user.unwrap_or_default();
        self.session.start(&access, &refresh, Some(user.clone()));

        match self.fetch_profile().await {
            Ok(profile) => Ok(profile),
            Err(e) if e.is_unauthenticated() => Err(e),
            Err(e) => {
                warn!(error = %e, "Failed to fetch profile after login");
                Ok(user)
            }
        }
    }

    /// Fetch the logged-in user's profile from the endpoint matching their
    /// role and merge it into the stored user.
    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        if !self.session.is_authenticated() {
            return Err(ApiError::Unauthenticated);
        }

        let role = self.session.user().map(|u| u.role()).unwrap_or_default();
        let path = format!("/auth/{}/profile/", role.profile_segment());
        debug!(path = %path, "Fetching profile");

        let fetched: UserProfile = self.get(&path).await?;

        let mut user = self.session.user().unwrap_or_default();
        user.merge_fetched(fetched, Utc::now().timestamp_millis());
        self.session.set_user(user.clone());
        Ok(user)
    }

    /// Drop all credentials. There is no server call; safe to call repeatedly.
    pub fn logout(&self) {
        info!("Logging out");
        self.session.clear();
    }
}

/// Drives one request through `RequestPhase`s until a terminal phase.
struct Pipeline<'a> {
    client: &'a SessionClient,
    options: &'a RequestOptions,
    request: OutboundRequest,
    phase: RequestPhase,
    history: Vec<RequestPhase>,
    outcome: Option<Result<RawResponse, ApiError>>,
}

impl Pipeline<'_> {
    async fn run(mut self) -> (Result<RawResponse, ApiError>, Vec<RequestPhase>) {
        while !self.phase.is_terminal() {
            let next = match self.phase {
                RequestPhase::Sending | RequestPhase::Retrying => self.send().await,
                RequestPhase::Refreshing => self.refresh().await,
                RequestPhase::Done | RequestPhase::Failed => break,
            };
            debug!(url = %self.request.url, from = ?self.phase, to = ?next, "Request phase");
            self.phase = next;
            self.history.push(next);
        }

        let outcome = self.outcome.take().unwrap_or_else(|| {
            Err(ApiError::InvalidResponse(
                "Request finished without a response".to_string(),
            ))
        });
        (outcome, self.history)
    }

    fn finish(&mut self, result: Result<RawResponse, ApiError>) -> RequestPhase {
        let phase = if result.is_ok() {
            RequestPhase::Done
        } else {
            RequestPhase::Failed
        };
        self.outcome = Some(result);
        phase
    }

    async fn send(&mut self) -> RequestPhase {
        if self.options.authenticate {
            let token = self.client.session.access_token();
            if let Err(e) = self.request.set_bearer(token.as_deref()) {
                return self.finish(Err(e));
            }
        }

        let response = match self.client.transport.send(&self.request).await {
            Ok(response) => response,
            Err(e) => return self.finish(Err(e)),
        };

        if response.is_success() {
            return self.finish(Ok(response));
        }

        if response.status == StatusCode::UNAUTHORIZED && self.options.refresh_on_unauthorized {
            if !self.request.retried {
                debug!(url = %self.request.url, "Unauthorized, refreshing access token");
                return RequestPhase::Refreshing;
            }
            warn!(url = %self.request.url, "Still unauthorized after token refresh, logging out");
            self.client.session.clear();
            return self.finish(Err(ApiError::Unauthenticated));
        }

        self.finish(Err(ApiError::from_status(response.status, &response.body)))
    }

    async fn refresh(&mut self) -> RequestPhase {
        self.request.retried = true;
        match self.client.refresh().await {
            Ok(_) => RequestPhase::Retrying,
            Err(e) => self.finish(Err(e)),
        }
    }
}

pub(super) fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::InvalidRequest(format!("Failed to serialize request body: {}", e)))
}

fn decode<T: DeserializeOwned>(response: &RawResponse, path: &str) -> Result<T, ApiError> {
    let body = if response.body.trim().is_empty() {
        "null"
    } else {
        response.body.as_str()
    };
    serde_json::from_str(body).map_err(|e| {
        ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
    })
}
