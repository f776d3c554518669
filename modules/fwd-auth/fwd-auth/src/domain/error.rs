//! Domain errors for the forward-auth engine.

use fwd_auth_sdk::SessionOracleError;
use fwd_auth_sdk::cookies::WeakSecret;

use super::redirect_cookie::InvalidCookie;

/// Internal domain errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("missing forwarding headers: {missing}")]
    MissingForwardHeaders { missing: String },

    #[error("invalid redirect cookie: {0}")]
    InvalidRedirectCookie(#[from] InvalidCookie),

    #[error(transparent)]
    WeakCookieSecret(#[from] WeakSecret),

    #[error("token exchange failed: {0}")]
    OidcExchangeFailure(String),

    #[error("identity provider unavailable: {0}")]
    OracleUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<SessionOracleError> for DomainError {
    fn from(e: SessionOracleError) -> Self {
        match e {
            SessionOracleError::Exchange(msg) => Self::OidcExchangeFailure(msg),
            SessionOracleError::Unavailable(msg) => Self::OracleUnavailable(msg),
            SessionOracleError::Internal(msg) => Self::Internal(msg),
        }
    }
}
