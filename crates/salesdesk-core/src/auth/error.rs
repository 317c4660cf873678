use thiserror::Error;

/// Failures of the token endpoints.
///
/// Kept `Clone` so a single refresh outcome can be handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Login was rejected or could not reach the server.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The refresh credential was rejected or the exchange failed.
    #[error("Refresh denied: {0}")]
    AuthDenied(String),
}

impl AuthError {
    pub fn message(&self) -> &str {
        match self {
            AuthError::InvalidCredentials(msg) | AuthError::AuthDenied(msg) => msg,
        }
    }
}
