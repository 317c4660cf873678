//! Request pipeline shared by every domain call.
//!
//! Before a request is sent the current access credential is attached if it
//! is still valid. When the server answers 401 the pipeline refreshes the
//! access credential once and replays the request once; if the refresh
//! fails the session is cleared and the denial returned. Callers only ever
//! see the final outcome.

use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::ApiError;
use crate::auth::{AuthError, Session, TokenEndpoint};
use crate::config::{join_url, RefreshMode};

type RefreshFuture = Shared<BoxFuture<'static, Result<String, AuthError>>>;

/// A domain request, described independently of any one send so it can be
/// replayed after a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
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

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidInput(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// One request's passage through the pipeline.
///
/// `retried` is set once a refresh has been attempted for this request and is
/// never shared with other requests. `bearer` overrides the session's access
/// credential for the replay.
#[derive(Debug)]
struct Attempt {
    request: ApiRequest,
    retried: bool,
    bearer: Option<String>,
}

impl Attempt {
    fn new(request: ApiRequest) -> Self {
        Self {
            request,
            retried: false,
            bearer: None,
        }
    }
}

pub struct AuthPipeline {
    http: Client,
    base_url: String,
    session: Arc<Session>,
    tokens: TokenEndpoint,
    mode: RefreshMode,
    in_flight: Mutex<Option<RefreshFuture>>,
}

impl AuthPipeline {
    pub fn new(http: Client, base_url: impl Into<String>, session: Arc<Session>) -> Self {
        let base_url = base_url.into();
        let tokens = TokenEndpoint::new(http.clone(), base_url.clone());
        Self {
            http,
            base_url,
            session,
            tokens,
            mode: RefreshMode::default(),
            in_flight: Mutex::new(None),
        }
    }

    pub fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn tokens(&self) -> &TokenEndpoint {
        &self.tokens
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `request`, recovering from one authorization denial.
    ///
    /// Returns the final response whatever its status, except that a 401
    /// which could not be recovered becomes [`ApiError::Unauthorized`].
    pub async fn execute(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let mut attempt = Attempt::new(request);

        loop {
            let response = self.send(&attempt).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            if attempt.retried {
                debug!(path = %attempt.request.path, "Denied after refresh, giving up");
                return Err(ApiError::Unauthorized);
            }

            let Some(refresh) = self.session.current_refresh() else {
                debug!(path = %attempt.request.path, "Denied with no refresh credential");
                return Err(ApiError::Unauthorized);
            };

            attempt.retried = true;
            match self.refresh_access(refresh).await {
                Ok(access) => {
                    self.session.set_access(&access);
                    attempt.bearer = Some(access);
                    debug!(
                        path = %attempt.request.path,
                        "Replaying request with refreshed credential"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Refresh failed, ending session");
                    self.session.clear();
                    return Err(ApiError::Unauthorized);
                }
            }
        }
    }

    /// Like [`execute`](Self::execute) but maps non-success statuses to errors.
    pub async fn execute_checked(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let response = self.execute(request).await?;
        check_response(response).await
    }

    async fn send(&self, attempt: &Attempt) -> Result<Response, ApiError> {
        let request = &attempt.request;
        let url = join_url(&self.base_url, &request.path);
        let mut builder = self.http.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let bearer = attempt
            .bearer
            .clone()
            .or_else(|| self.session.valid_access());
        debug!(
            method = %request.method,
            path = %request.path,
            authorized = bearer.is_some(),
            retried = attempt.retried,
            "Sending request"
        );
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        Ok(builder.send().await?)
    }

    async fn refresh_access(&self, refresh: String) -> Result<String, AuthError> {
        match self.mode {
            RefreshMode::Independent => self.tokens.refresh(&refresh).await,
            RefreshMode::SingleFlight => {
                let shared = self.join_refresh(refresh)?;
                let result = shared.clone().await;
                if let Ok(mut slot) = self.in_flight.lock() {
                    if slot.as_ref().is_some_and(|f| f.ptr_eq(&shared)) {
                        *slot = None;
                    }
                }
                result
            }
        }
    }

    /// The in-flight refresh, starting one if none is running.
    fn join_refresh(&self, refresh: String) -> Result<RefreshFuture, AuthError> {
        let mut slot = self
            .in_flight
            .lock()
            .map_err(|_| AuthError::AuthDenied("refresh state poisoned".to_string()))?;

        if let Some(existing) = slot.as_ref() {
            debug!("Joining in-flight refresh");
            return Ok(existing.clone());
        }

        let tokens = self.tokens.clone();
        let shared = async move { tokens.refresh(&refresh).await }
            .boxed()
            .shared();
        *slot = Some(shared.clone());
        Ok(shared)
    }
}

/// Pass successful responses through, turning anything else into an `ApiError`.
pub(crate) async fn check_response(response: Response) -> Result<Response, ApiError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = ApiRequest::get("productos/")
            .query("search", "pan")
            .query("ordering", "-precio");
        assert_eq!(req.method, Method::GET);
        assert_eq!(
            req.query,
            vec![
                ("search".to_string(), "pan".to_string()),
                ("ordering".to_string(), "-precio".to_string())
            ]
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn test_request_json_body() {
        let req = ApiRequest::post("ventas/")
            .json(&serde_json::json!({ "cliente": 1 }))
            .unwrap();
        assert_eq!(req.body, Some(serde_json::json!({ "cliente": 1 })));
    }

    #[test]
    fn test_attempt_starts_unretried() {
        let attempt = Attempt::new(ApiRequest::delete("clientes/3/"));
        assert!(!attempt.retried);
        assert!(attempt.bearer.is_none());
    }

    fn pipeline_for(server: &mockito::ServerGuard, mode: RefreshMode) -> AuthPipeline {
        AuthPipeline::new(
            Client::new(),
            format!("{}/api", server.url()),
            Arc::new(Session::in_memory()),
        )
        .with_refresh_mode(mode)
    }

    #[tokio::test]
    async fn test_single_flight_shares_one_refresh() {
        let mut server = mockito::Server::new_async().await;
        let refresh = server
            .mock("POST", "/api/token/refresh/")
            .with_status(200)
            .with_body(r#"{"access": "fresh"}"#)
            .expect(1)
            .create_async()
            .await;

        let pipeline = pipeline_for(&server, RefreshMode::SingleFlight);
        let first = pipeline.join_refresh("r".to_string()).unwrap();
        let second = pipeline.join_refresh("r".to_string()).unwrap();
        assert!(first.ptr_eq(&second));

        let (a, b) = tokio::join!(first, second);
        refresh.assert_async().await;
        assert_eq!(a, Ok("fresh".to_string()));
        assert_eq!(b, Ok("fresh".to_string()));
    }

    #[tokio::test]
    async fn test_single_flight_slot_is_released() {
        let mut server = mockito::Server::new_async().await;
        let refresh = server
            .mock("POST", "/api/token/refresh/")
            .with_status(401)
            .expect(2)
            .create_async()
            .await;

        let pipeline = pipeline_for(&server, RefreshMode::SingleFlight);
        assert!(pipeline.refresh_access("r".to_string()).await.is_err());
        assert!(pipeline.in_flight.lock().unwrap().is_none());
        // A later refresh starts a new exchange instead of reusing the old outcome
        assert!(pipeline.refresh_access("r".to_string()).await.is_err());
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_independent_refreshes_each_call() {
        let mut server = mockito::Server::new_async().await;
        let refresh = server
            .mock("POST", "/api/token/refresh/")
            .with_status(200)
            .with_body(r#"{"access": "fresh"}"#)
            .expect(2)
            .create_async()
            .await;

        let pipeline = pipeline_for(&server, RefreshMode::Independent);
        let (a, b) = tokio::join!(
            pipeline.refresh_access("r".to_string()),
            pipeline.refresh_access("r".to_string())
        );
        refresh.assert_async().await;
        assert_eq!(a, Ok("fresh".to_string()));
        assert_eq!(b, Ok("fresh".to_string()));
    }
}
