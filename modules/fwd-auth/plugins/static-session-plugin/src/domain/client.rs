//! Client implementation for the static session oracle.
//!
//! Implements `SessionOracleClient` using the domain service.

use async_trait::async_trait;
use fwd_auth_sdk::{
    AuthStatus, CallbackOutcome, LoginOptions, LoginRedirect, LogoutOptions, LogoutRedirect,
    SessionOracleClient, SessionOracleError,
};
use http::request::Parts;

use super::service::Service;

#[async_trait]
impl SessionOracleClient for Service {
    async fn status(&self, parts: &Parts) -> Result<AuthStatus, SessionOracleError> {
        Ok(Service::status(self, &parts.headers))
    }

    async fn login(&self, options: LoginOptions) -> Result<LoginRedirect, SessionOracleError> {
        Service::login(self, &options)
    }

    async fn complete_login(&self, parts: &Parts) -> Result<CallbackOutcome, SessionOracleError> {
        // The login page sets the static cookie itself; nothing to exchange.
        Ok(CallbackOutcome::unchanged(Service::status(
            self,
            &parts.headers,
        )))
    }

    async fn logout(&self, options: LogoutOptions) -> Result<LogoutRedirect, SessionOracleError> {
        Ok(Service::logout(self, options))
    }
}
