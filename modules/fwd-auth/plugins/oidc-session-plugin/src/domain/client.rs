//! Client implementation for the OIDC session plugin.
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
        Service::login(self, options).await
    }

    async fn complete_login(&self, parts: &Parts) -> Result<CallbackOutcome, SessionOracleError> {
        Service::complete_login(self, parts).await
    }

    async fn logout(&self, options: LogoutOptions) -> Result<LogoutRedirect, SessionOracleError> {
        Service::logout(self, options).await
    }
}
