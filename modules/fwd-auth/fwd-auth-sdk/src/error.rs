//! Error types for the session oracle.

use thiserror::Error;

/// Errors that can occur when using the session oracle API.
#[derive(Debug, Error)]
pub enum SessionOracleError {
    /// The authorization code exchange or ID token validation failed.
    #[error("token exchange failed: {0}")]
    Exchange(String),

    /// The identity provider or its metadata is not reachable.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}
