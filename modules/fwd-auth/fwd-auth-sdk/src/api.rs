//! Public API trait for the session oracle.
//!
//! The decision engine never talks to the identity provider itself. It asks
//! the oracle whether the caller is authenticated, and delegates the actual
//! login redirect, the callback code exchange and the sign-out to it.

use async_trait::async_trait;
use http::request::Parts;

use crate::error::SessionOracleError;
use crate::models::{
    AuthStatus, CallbackOutcome, LoginOptions, LoginRedirect, LogoutOptions, LogoutRedirect,
};

/// Session oracle consumed by the forward-auth handlers.
///
/// Implementations are shared across all requests behind an `Arc` and must
/// not keep per-request state: everything a flow needs travels in the
/// request and in the cookies returned from these calls.
#[async_trait]
pub trait SessionOracleClient: Send + Sync {
    /// Report whether the caller behind `parts` holds a valid session.
    ///
    /// This is expected to be cheap (cookie or in-memory backed).
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the oracle cannot answer yet
    /// - `Internal` for unexpected errors
    async fn status(&self, parts: &Parts) -> Result<AuthStatus, SessionOracleError>;

    /// Build the redirect that sends the caller to the identity provider.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if provider metadata cannot be loaded
    /// - `Internal` for unexpected errors
    async fn login(&self, options: LoginOptions) -> Result<LoginRedirect, SessionOracleError>;

    /// Complete a pending login on the callback path.
    ///
    /// When the request carries an authorization response the oracle
    /// exchanges it and establishes the session; otherwise it reports the
    /// current status unchanged.
    ///
    /// # Errors
    ///
    /// - `Exchange` if the code exchange or ID token verification fails
    /// - `Unavailable` if provider metadata cannot be loaded
    /// - `Internal` for unexpected errors
    async fn complete_login(&self, parts: &Parts) -> Result<CallbackOutcome, SessionOracleError>;

    /// End the caller's session and build the redirect that signs them out
    /// of the identity provider, ending on `options.return_to`.
    ///
    /// # Errors
    ///
    /// - `Internal` if the post-logout URL is unusable
    async fn logout(&self, options: LogoutOptions) -> Result<LogoutRedirect, SessionOracleError>;
}
