//! Forward-auth service definition.
//!
//! Contains the `ForwardAuth` state shared by every handler of the main
//! listener and its construction from configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use cookie::time::Duration;
use fwd_auth_sdk::SessionOracleClient;
use fwd_auth_sdk::cookies::CookieScope;
use http::{HeaderName, HeaderValue};
use tracing::info;

use crate::api::rest::routes;
use crate::config::ForwardAuthConfig;
use crate::domain::decision::DecisionEngine;
use crate::domain::redirect_cookie::RedirectCookieCodec;

/// Immutable per-process state behind the main listener.
#[derive(Clone)]
pub struct ForwardAuth {
    pub(crate) engine: Arc<DecisionEngine>,
    pub(crate) oracle: Arc<dyn SessionOracleClient>,
    pub(crate) identity_header: HeaderName,
    pub(crate) response_headers: Arc<[(HeaderName, HeaderValue)]>,
}

impl ForwardAuth {
    /// Validate `config` and wire the engine to `oracle`.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the cookie secret
    /// is too short.
    pub fn new(
        config: ForwardAuthConfig,
        cookie_secret: &[u8],
        oracle: Arc<dyn SessionOracleClient>,
    ) -> Result<Self> {
        config.validate()?;

        let ttl = Duration::try_from(std::time::Duration::from_secs(
            config.redirect_cookie_ttl_secs,
        ))
        .context("redirect_cookie_ttl_secs is out of range")?;
        let scope = CookieScope::new(config.common_auth_domain.clone(), config.secure_cookies);
        let codec = RedirectCookieCodec::from_secret(cookie_secret, scope, ttl)?;

        let identity_header = config.identity_header_name()?;
        let response_headers: Arc<[(HeaderName, HeaderValue)]> = config.response_headers()?.into();

        info!(
            callback_path = %config.callback_path,
            common_auth_domain = %config.common_auth_domain,
            require_auth_always = config.require_auth_always,
            max_login_attempts = config.max_login_attempts,
            "forward-auth configured"
        );

        Ok(Self {
            engine: Arc::new(DecisionEngine::new(Arc::new(config), codec)),
            oracle,
            identity_header,
            response_headers,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ForwardAuthConfig {
        self.engine.config()
    }

    /// Router of the main listener with the full middleware stack.
    #[must_use]
    pub fn router(&self) -> Router {
        routes::router(self.clone())
    }
}
