//! Authenticated request gateway.
//!
//! Every outbound API call passes through [`ApiGateway`]. The gateway
//! attaches the session's bearer token, detects authentication failures,
//! performs at most one concurrent token refresh, and replays requests that
//! were waiting while the refresh was in flight. Callers never see token
//! attachment or refresh; a stale session self-heals silently, and an
//! unrecoverable one clears the [`SessionStore`] and fires the installed
//! session-expired hook.

use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::debug;

use crate::core::session::SessionStore;
use crate::utils::url::{construct_api_url, normalize_base_url};

const REQUEST_TIMEOUT_S: u64 = 10;
const REFRESH_ENDPOINT: &str = "v1/auth/refresh";

/// Failures surfaced by the gateway.
#[derive(Debug)]
pub enum GatewayError {
    /// Transport-level failure, timeout, or undecodable response body.
    /// Never triggers a refresh.
    Network(reqwest::Error),
    /// The backend rejected the request with 401 after the one allowed
    /// replay.
    AuthRequired,
    /// No usable refresh token, or the refresh endpoint rejected it. The
    /// session has been cleared.
    RefreshFailed(String),
    /// Any other non-success status, propagated unchanged.
    Http { status: StatusCode, body: String },
    /// The request body could not be encoded.
    InvalidRequest(serde_json::Error),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Network(err) => write!(f, "network error: {err}"),
            GatewayError::AuthRequired => write!(f, "authentication required"),
            GatewayError::RefreshFailed(msg) => write!(f, "session refresh failed: {msg}"),
            GatewayError::Http { status, body } => {
                write!(f, "API request failed with status {status}: {body}")
            }
            GatewayError::InvalidRequest(err) => write!(f, "invalid request payload: {err}"),
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GatewayError::Network(err) => Some(err),
            GatewayError::InvalidRequest(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// A single outbound API call: method, path relative to the backend origin,
/// query parameters, extra headers, and an optional JSON body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Add an explicit header. Setting `Authorization` here suppresses the
    /// gateway's own bearer attachment.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: &impl Serialize) -> Result<Self, GatewayError> {
        self.body = Some(serde_json::to_value(body).map_err(GatewayError::InvalidRequest)?);
        Ok(self)
    }

    fn has_explicit_authorization(&self) -> bool {
        self.headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("authorization"))
    }
}

/// Bounds replays to exactly one per original request. A request that fails
/// again after a refresh is a terminal failure, never retried twice.
struct RetryEnvelope {
    request: ApiRequest,
    retried: bool,
}

/// Refresh coordination. The check-and-set of this state happens entirely
/// under one lock acquisition and the lock is never held across an await,
/// so two concurrent 401s cannot both start a refresh.
enum RefreshState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<String>>,
    },
}

type SessionExpiredHook = Box<dyn Fn() + Send + Sync>;

pub struct ApiGateway {
    client: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
    refresh: Mutex<RefreshState>,
    expired_hook: Mutex<Option<SessionExpiredHook>>,
}

impl ApiGateway {
    pub fn new(base_url: &str, session: Arc<SessionStore>) -> Result<Self, GatewayError> {
        Self::new_with_timeout(base_url, session, Duration::from_secs(REQUEST_TIMEOUT_S))
    }

    pub fn new_with_timeout(
        base_url: &str,
        session: Arc<SessionStore>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::Network)?;
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
            session,
            refresh: Mutex::new(RefreshState::Idle),
            expired_hook: Mutex::new(None),
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Install the hook fired when a refresh fails and the session is
    /// cleared. Interactive commands use it to point the user back at
    /// `login`; the login flow itself installs none.
    pub fn set_session_expired_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        if let Ok(mut slot) = self.expired_hook.lock() {
            *slot = Some(Box::new(hook));
        }
    }

    /// Run the full pipeline and decode a JSON response body.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, GatewayError> {
        let response = check_status(self.send(request).await?).await?;
        response.json::<T>().await.map_err(GatewayError::Network)
    }

    /// Run the full pipeline for endpoints whose response body is ignored.
    pub async fn execute_unit(&self, request: ApiRequest) -> Result<(), GatewayError> {
        check_status(self.send(request).await?).await?;
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        self.execute(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, GatewayError> {
        self.execute(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put_unit(&self, path: &str, body: &impl Serialize) -> Result<(), GatewayError> {
        self.execute_unit(ApiRequest::put(path).json(body)?).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, GatewayError> {
        self.execute(ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete_unit(&self, path: &str) -> Result<(), GatewayError> {
        self.execute_unit(ApiRequest::delete(path)).await
    }

    /// The interceptor pipeline without body handling, for callers that
    /// stream the response. The returned response may still carry a
    /// non-success status (including a terminal 401 after the one allowed
    /// replay); only refresh failures surface as errors here.
    pub async fn send(&self, request: ApiRequest) -> Result<reqwest::Response, GatewayError> {
        let mut envelope = RetryEnvelope {
            request,
            retried: false,
        };
        let mut bearer_override: Option<String> = None;

        loop {
            let response = self
                .dispatch(&envelope.request, bearer_override.as_deref())
                .await?;

            if response.status() == StatusCode::UNAUTHORIZED && !envelope.retried {
                envelope.retried = true;
                debug!(
                    "401 on {} {}, coordinating token refresh",
                    envelope.request.method, envelope.request.path
                );
                let token = self.refreshed_access_token().await?;
                bearer_override = Some(token);
                continue;
            }

            return Ok(response);
        }
    }

    /// Explicitly run the refresh protocol (same single-flight coordination
    /// as the 401 path). Used by bootstrap when the stored token has reached
    /// its expiry safety margin.
    pub async fn refresh_session(&self) -> Result<(), GatewayError> {
        self.refreshed_access_token().await.map(|_| ())
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        bearer_override: Option<&str>,
    ) -> Result<reqwest::Response, GatewayError> {
        let url = construct_api_url(&self.base_url, &request.path);
        let mut builder = self.client.request(request.method.clone(), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            // A replay's refreshed token supersedes whatever credential the
            // caller originally supplied.
            if bearer_override.is_some() && name.eq_ignore_ascii_case("authorization") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(token) = bearer_override {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        } else if !request.has_explicit_authorization() {
            if let Some(token) = self.session.access_token() {
                builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
            }
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(GatewayError::Network)
    }

    /// Resolve to a usable access token, issuing at most one refresh call no
    /// matter how many requests hit a 401 concurrently. The first caller
    /// becomes the leader and performs the network call; everyone else
    /// enqueues a waiter and is resolved (in FIFO order) with the leader's
    /// token, or fails when the leader's refresh fails.
    async fn refreshed_access_token(&self) -> Result<String, GatewayError> {
        let waiter = {
            let mut state = self
                .refresh
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match &mut *state {
                RefreshState::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing {
                        waiters: Vec::new(),
                    };
                    None
                }
            }
        };

        if let Some(rx) = waiter {
            debug!("refresh already in flight, queueing");
            return rx.await.map_err(|_| {
                GatewayError::RefreshFailed("session was invalidated while queued".to_string())
            });
        }

        let outcome = self.run_refresh().await;

        let waiters = {
            let mut state = self
                .refresh
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::Refreshing { waiters } => waiters,
                RefreshState::Idle => Vec::new(),
            }
        };

        match outcome {
            Ok(token) => {
                debug!("token refresh succeeded, releasing {} waiter(s)", waiters.len());
                for waiter in waiters {
                    let _ = waiter.send(token.clone());
                }
                Ok(token)
            }
            Err(err) => {
                // Dropping the waiters closes their channels: queued requests
                // surface as failed once the session is invalid.
                drop(waiters);
                debug!("token refresh failed: {err}");
                self.session.logout();
                self.notify_session_expired();
                Err(err)
            }
        }
    }

    async fn run_refresh(&self) -> Result<String, GatewayError> {
        let Some(refresh_token) = self.session.refresh_token() else {
            return Err(GatewayError::RefreshFailed(
                "no refresh token stored".to_string(),
            ));
        };

        let url = construct_api_url(&self.base_url, REFRESH_ENDPOINT);
        let response = self
            .client
            .post(url)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await
            .map_err(|err| GatewayError::RefreshFailed(format!("refresh request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(GatewayError::RefreshFailed(format!(
                "refresh endpoint returned {status}"
            )));
        }

        let tokens: RefreshResponse = response.json().await.map_err(|err| {
            GatewayError::RefreshFailed(format!("refresh response malformed: {err}"))
        })?;

        self.session
            .set_tokens(&tokens.access_token, &tokens.refresh_token, tokens.expires_in);
        Ok(tokens.access_token)
    }

    fn notify_session_expired(&self) {
        if let Ok(slot) = self.expired_hook.lock() {
            if let Some(hook) = slot.as_ref() {
                hook();
            }
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(GatewayError::AuthRequired);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    Err(GatewayError::Http { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{sample_user, TestBackend, TestResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn refresh_body(access: &str, refresh: &str) -> String {
        format!(
            r#"{{"access_token":"{access}","refresh_token":"{refresh}","expires_in":3600}}"#
        )
    }

    fn session_with(access: &str, refresh: &str) -> Arc<SessionStore> {
        let session = Arc::new(SessionStore::ephemeral());
        session.set_tokens(access, refresh, 3600);
        session
    }

    #[test]
    fn refresh_response_deserializes_expected_fields() {
        let tokens: RefreshResponse = serde_json::from_str(&refresh_body("a2", "r2"))
            .expect("refresh response should deserialize");
        assert_eq!(tokens.access_token, "a2");
        assert_eq!(tokens.refresh_token, "r2");
        assert_eq!(tokens.expires_in, 3600);
    }

    #[tokio::test]
    async fn attaches_bearer_token_from_store() {
        let backend = TestBackend::spawn(|_| TestResponse::json(200, r#"{"ok":true}"#)).await;
        let session = session_with("a1", "r1");
        let gateway = ApiGateway::new(&backend.base_url, session).unwrap();

        let _: serde_json::Value = gateway.get("/v1/models").await.unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer a1"));
    }

    #[tokio::test]
    async fn explicit_authorization_header_is_left_alone() {
        let backend = TestBackend::spawn(|_| TestResponse::json(200, r#"{"ok":true}"#)).await;
        let session = session_with("a1", "r1");
        let gateway = ApiGateway::new(&backend.base_url, session).unwrap();

        let request = ApiRequest::get("/v1/models").header("Authorization", "Bearer custom");
        let _: serde_json::Value = gateway.execute(request).await.unwrap();

        let requests = backend.requests();
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer custom"));
    }

    #[tokio::test]
    async fn happy_path_refresh_replays_with_new_token() {
        let backend = TestBackend::spawn(|request| {
            if request.path.starts_with("/v1/auth/refresh") {
                TestResponse::json(200, &refresh_body("a2", "r2"))
            } else if request.authorization.as_deref() == Some("Bearer a2") {
                TestResponse::json(200, r#"{"value":42}"#)
            } else {
                TestResponse::json(401, r#"{"error":"expired"}"#)
            }
        })
        .await;
        let session = session_with("a1", "r1");
        let gateway = ApiGateway::new(&backend.base_url, session.clone()).unwrap();

        let result: serde_json::Value = gateway.get("/v1/conversations").await.unwrap();
        assert_eq!(result["value"], 42);

        assert_eq!(session.access_token().as_deref(), Some("a2"));
        assert_eq!(session.refresh_token().as_deref(), Some("r2"));

        let requests = backend.requests();
        let refresh_calls: Vec<_> = requests
            .iter()
            .filter(|r| r.path.starts_with("/v1/auth/refresh"))
            .collect();
        assert_eq!(refresh_calls.len(), 1);
        assert!(refresh_calls[0].body.contains(r#""refresh_token":"r1""#));
        let replay = requests
            .iter()
            .rfind(|r| r.path.starts_with("/v1/conversations"))
            .unwrap();
        assert_eq!(replay.authorization.as_deref(), Some("Bearer a2"));
    }

    #[tokio::test]
    async fn concurrent_401s_share_a_single_refresh() {
        let refresh_calls = Arc::new(AtomicUsize::new(0));
        let counter = refresh_calls.clone();
        let backend = TestBackend::spawn(move |request| {
            if request.path.starts_with("/v1/auth/refresh") {
                counter.fetch_add(1, Ordering::SeqCst);
                // Slow refresh keeps the other 401s queued behind it.
                TestResponse::json(200, &refresh_body("aX", "rX")).with_delay(100)
            } else if request.authorization.as_deref() == Some("Bearer aX") {
                TestResponse::json(200, r#"{"ok":true}"#)
            } else {
                TestResponse::json(401, r#"{"error":"expired"}"#)
            }
        })
        .await;
        let session = session_with("a1", "r1");
        let gateway = ApiGateway::new(&backend.base_url, session.clone()).unwrap();

        let (a, b, c) = tokio::join!(
            gateway.get::<serde_json::Value>("/v1/conversations"),
            gateway.get::<serde_json::Value>("/v1/models"),
            gateway.get::<serde_json::Value>("/v1/auth/me"),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.access_token().as_deref(), Some("aX"));
    }

    #[tokio::test]
    async fn second_401_is_terminal() {
        let refresh_calls = Arc::new(AtomicUsize::new(0));
        let counter = refresh_calls.clone();
        let backend = TestBackend::spawn(move |request| {
            if request.path.starts_with("/v1/auth/refresh") {
                counter.fetch_add(1, Ordering::SeqCst);
                TestResponse::json(200, &refresh_body("a2", "r2"))
            } else {
                // The backend keeps rejecting even the refreshed token.
                TestResponse::json(401, r#"{"error":"nope"}"#)
            }
        })
        .await;
        let session = session_with("a1", "r1");
        let gateway = ApiGateway::new(&backend.base_url, session).unwrap();

        let result = gateway.get::<serde_json::Value>("/v1/conversations").await;
        assert!(matches!(result, Err(GatewayError::AuthRequired)));
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_failure_clears_session_and_fires_hook_once() {
        let backend = TestBackend::spawn(|request| {
            if request.path.starts_with("/v1/auth/refresh") {
                TestResponse::json(401, r#"{"error":"invalid refresh token"}"#)
            } else {
                TestResponse::json(401, r#"{"error":"expired"}"#)
            }
        })
        .await;
        let session = session_with("a1", "r1");
        session.set_user(Some(sample_user("u1")));
        let gateway = ApiGateway::new(&backend.base_url, session.clone()).unwrap();

        let hook_calls = Arc::new(AtomicUsize::new(0));
        let hook_counter = hook_calls.clone();
        gateway.set_session_expired_hook(move || {
            hook_counter.fetch_add(1, Ordering::SeqCst);
        });

        let result = gateway.get::<serde_json::Value>("/v1/conversations").await;
        assert!(matches!(result, Err(GatewayError::RefreshFailed(_))));

        assert!(session.user().is_none());
        assert!(!session.is_authenticated());
        assert!(session.access_token().is_none());
        assert!(session.refresh_token().is_none());
        assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_refresh_token_never_reaches_the_refresh_endpoint() {
        let backend =
            TestBackend::spawn(|_| TestResponse::json(401, r#"{"error":"expired"}"#)).await;
        let session = Arc::new(SessionStore::ephemeral());
        session.set_user(Some(sample_user("u1")));
        let gateway = ApiGateway::new(&backend.base_url, session.clone()).unwrap();

        let result = gateway.get::<serde_json::Value>("/v1/conversations").await;
        assert!(matches!(result, Err(GatewayError::RefreshFailed(_))));

        assert!(session.user().is_none());
        let requests = backend.requests();
        assert!(requests
            .iter()
            .all(|r| !r.path.starts_with("/v1/auth/refresh")));
    }

    #[tokio::test]
    async fn queued_waiters_fail_when_refresh_fails() {
        let refresh_calls = Arc::new(AtomicUsize::new(0));
        let counter = refresh_calls.clone();
        let backend = TestBackend::spawn(move |request| {
            if request.path.starts_with("/v1/auth/refresh") {
                counter.fetch_add(1, Ordering::SeqCst);
                TestResponse::json(401, r#"{"error":"invalid refresh token"}"#).with_delay(100)
            } else {
                TestResponse::json(401, r#"{"error":"expired"}"#)
            }
        })
        .await;
        let session = session_with("a1", "r1");
        let gateway = ApiGateway::new(&backend.base_url, session.clone()).unwrap();

        let hook_calls = Arc::new(AtomicUsize::new(0));
        let hook_counter = hook_calls.clone();
        gateway.set_session_expired_hook(move || {
            hook_counter.fetch_add(1, Ordering::SeqCst);
        });

        let (a, b, c) = tokio::join!(
            gateway.get::<serde_json::Value>("/v1/conversations"),
            gateway.get::<serde_json::Value>("/v1/models"),
            gateway.get::<serde_json::Value>("/v1/auth/me"),
        );
        for result in [a, b, c] {
            assert!(matches!(result, Err(GatewayError::RefreshFailed(_))));
        }

        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
        assert!(session.access_token().is_none());
    }

    #[tokio::test]
    async fn timeout_surfaces_as_network_error_without_refresh() {
        let backend = TestBackend::spawn(|request| {
            if request.path.starts_with("/v1/auth/refresh") {
                TestResponse::json(200, &refresh_body("a2", "r2"))
            } else {
                TestResponse::json(200, r#"{"ok":true}"#).with_delay(500)
            }
        })
        .await;
        let session = session_with("a1", "r1");
        let gateway = ApiGateway::new_with_timeout(
            &backend.base_url,
            session,
            Duration::from_millis(50),
        )
        .unwrap();

        let result = gateway.get::<serde_json::Value>("/v1/conversations").await;
        assert!(matches!(result, Err(GatewayError::Network(_))));

        let requests = backend.requests();
        assert!(requests
            .iter()
            .all(|r| !r.path.starts_with("/v1/auth/refresh")));
    }

    #[tokio::test]
    async fn other_http_errors_propagate_unchanged() {
        let backend =
            TestBackend::spawn(|_| TestResponse::json(503, r#"{"error":"overloaded"}"#)).await;
        let session = session_with("a1", "r1");
        let gateway = ApiGateway::new(&backend.base_url, session).unwrap();

        let result = gateway.get::<serde_json::Value>("/v1/models").await;
        match result {
            Err(GatewayError::Http { status, body }) => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert!(body.contains("overloaded"));
            }
            other => panic!("expected Http error, got {other:?}"),
        }

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn proactive_refresh_session_updates_the_store() {
        let backend = TestBackend::spawn(|request| {
            if request.path.starts_with("/v1/auth/refresh") {
                TestResponse::json(200, &refresh_body("a2", "r2"))
            } else {
                TestResponse::json(200, r#"{"ok":true}"#)
            }
        })
        .await;
        let session = session_with("a1", "r1");
        let gateway = ApiGateway::new(&backend.base_url, session.clone()).unwrap();

        gateway.refresh_session().await.unwrap();
        assert_eq!(session.access_token().as_deref(), Some("a2"));
    }
}
