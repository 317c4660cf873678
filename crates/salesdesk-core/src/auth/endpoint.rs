//! Token issuance and refresh exchanges.
//!
//! Both calls bypass the request pipeline: they carry no bearer credential and
//! their denials must never trigger another refresh.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::AuthError;
use crate::api::error::detail_from_body;
use crate::config::join_url;

const TOKEN_PATH: &str = "token/";
const REFRESH_PATH: &str = "token/refresh/";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Credentials returned by a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Stateless client for the two token endpoints.
/// Clone is cheap - reqwest::Client shares its connection pool.
#[derive(Clone)]
pub struct TokenEndpoint {
    http: Client,
    base_url: String,
}

impl TokenEndpoint {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Exchange a username and password for an access/refresh pair.
    pub async fn issue(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let url = join_url(&self.base_url, TOKEN_PATH);
        let response = self
            .http
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| AuthError::InvalidCredentials(transport_message(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, "Token request rejected");
            let message = detail_from_body(&body).unwrap_or_else(|| match status {
                StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST => {
                    "Invalid username or password".to_string()
                }
                _ => format!("Login failed: server returned {}", status),
            });
            return Err(AuthError::InvalidCredentials(message));
        }

        response.json::<TokenPair>().await.map_err(|e| {
            warn!(error = %e, "Failed to parse token response");
            AuthError::InvalidCredentials("Login failed: invalid response from server".to_string())
        })
    }

    /// Trade a refresh credential for a new access credential.
    ///
    /// The refresh credential itself is not renewed. No retries.
    pub async fn refresh(&self, refresh: &str) -> Result<String, AuthError> {
        let url = join_url(&self.base_url, REFRESH_PATH);
        let response = self
            .http
            .post(&url)
            .json(&RefreshRequest { refresh })
            .send()
            .await
            .map_err(|e| AuthError::AuthDenied(transport_message(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = detail_from_body(&body)
                .unwrap_or_else(|| format!("server returned {}", status));
            return Err(AuthError::AuthDenied(reason));
        }

        let parsed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| AuthError::AuthDenied(format!("invalid refresh response: {}", e)))?;
        debug!("Access credential refreshed");
        Ok(parsed.access)
    }
}

fn transport_message(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Connection timed out. Please try again.".to_string()
    } else if e.is_connect() {
        "Unable to connect to server. Check your internet connection.".to_string()
    } else {
        format!("Request failed: {}", e)
    }
}
