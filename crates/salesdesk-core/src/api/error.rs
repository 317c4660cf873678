use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - session expired or not logged in")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rejected by server: {0}")]
    Validation(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            // Validation bodies are passed through whole for the caller to present
            400 | 422 => ApiError::Validation(body.to_string()),
            403 => ApiError::AccessDenied(Self::truncate_body(body)),
            404 => ApiError::NotFound(Self::truncate_body(body)),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(Self::truncate_body(body)),
            _ => ApiError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// The server's `detail` message, when the error body carries one.
    pub fn detail(&self) -> Option<String> {
        let body = match self {
            ApiError::AccessDenied(b)
            | ApiError::NotFound(b)
            | ApiError::Validation(b)
            | ApiError::ServerError(b) => b,
            _ => return None,
        };
        detail_from_body(body)
    }

    /// Message for the user: the server's `detail` if present, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Unauthorized => "Session expired. Please log in again.".to_string(),
            ApiError::InvalidInput(msg) => msg.clone(),
            _ => self.detail().unwrap_or_else(|| fallback.to_string()),
        }
    }
}

/// Pull `detail` out of a JSON error body.
pub(crate) fn detail_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
