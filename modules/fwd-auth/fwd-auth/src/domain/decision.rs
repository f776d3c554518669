//! The authentication decision engine.
//!
//! Pure and synchronous: the handlers await the session oracle and hand the
//! resulting [`AuthStatus`] in together with the request facts. Each call
//! yields exactly one [`DecisionOutcome`] and the cookie mutations it needs.

use std::sync::Arc;

use cookie::Cookie;
use fwd_auth_sdk::{AuthStatus, AuthorizationParams};
use http::HeaderMap;
use tracing::{debug, info, warn};

use super::error::DomainError;
use super::forward_context::{ForwardContext, is_forwarded};
use super::login_attempts;
use super::redirect_cookie::RedirectCookieCodec;
use crate::config::ForwardAuthConfig;

/// Which handler the request arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    General,
    Callback,
}

/// What the engine looks at besides the session status.
#[derive(Debug, Clone, Copy)]
pub struct RequestFacts<'a> {
    pub path: &'a str,
    pub headers: &'a HeaderMap,
}

impl<'a> RequestFacts<'a> {
    #[must_use]
    pub fn new(path: &'a str, headers: &'a HeaderMap) -> Self {
        Self { path, headers }
    }
}

/// The single discrete result of a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// Let the proxy forward the original request.
    Allow { subject: String },
    /// Authenticated, but the request did not come through the proxy.
    DenyDirectAccess,
    /// Send the caller to the identity provider.
    RedirectToLogin {
        return_to: String,
        params: AuthorizationParams,
    },
    /// Login finished; go back to where the caller was headed.
    RedirectToOrigin { url: String },
    /// Login finished but the destination is unknown.
    RedirectToDefaultLanding { url: String },
    /// The callback kept coming back unauthenticated.
    LoginAttemptsExhausted { attempts: u32 },
    /// The callback path reached the general handler.
    CallbackOnGeneralPath { path: String },
    /// End the session and send the caller to `return_to` once signed out.
    SignOut { return_to: String },
}

/// Outcome plus the cookies to set or remove with the response.
#[derive(Debug, Clone)]
pub struct Decision {
    pub outcome: DecisionOutcome,
    pub cookies: Vec<Cookie<'static>>,
}

impl Decision {
    fn new(outcome: DecisionOutcome, cookies: Vec<Cookie<'static>>) -> Self {
        Self { outcome, cookies }
    }

    fn bare(outcome: DecisionOutcome) -> Self {
        Self::new(outcome, Vec::new())
    }
}

pub struct DecisionEngine {
    config: Arc<ForwardAuthConfig>,
    codec: RedirectCookieCodec,
}

impl DecisionEngine {
    #[must_use]
    pub fn new(config: Arc<ForwardAuthConfig>, codec: RedirectCookieCodec) -> Self {
        Self { config, codec }
    }

    #[must_use]
    pub fn config(&self) -> &ForwardAuthConfig {
        &self.config
    }

    #[must_use]
    pub fn is_callback_path(&self, path: &str) -> bool {
        path == self.config.callback_path
    }

    /// Decide what to do with a request.
    #[must_use]
    pub fn decide(&self, route: Route, status: &AuthStatus, facts: &RequestFacts<'_>) -> Decision {
        match route {
            Route::General => self.decide_general(status, facts),
            Route::Callback => self.decide_callback(status, facts),
        }
    }

    /// Refuse to run the general logic for the callback path.
    ///
    /// Returns `None` when `path` is not the callback path.
    #[must_use]
    pub fn guard_general_path(&self, path: &str) -> Option<Decision> {
        if !self.is_callback_path(path) {
            return None;
        }
        warn!(path, "callback path reached the general handler");
        Some(Decision::bare(DecisionOutcome::CallbackOnGeneralPath {
            path: path.to_owned(),
        }))
    }

    fn decide_general(&self, status: &AuthStatus, facts: &RequestFacts<'_>) -> Decision {
        if let Some(rejected) = self.guard_general_path(facts.path) {
            return rejected;
        }

        let forwarded = is_forwarded(facts.headers);

        if status.is_authenticated() {
            if forwarded {
                let subject = status.current_subject().unwrap_or_default().to_owned();
                debug!(subject = %subject, "authenticated forwarded request allowed");
                return Decision::bare(DecisionOutcome::Allow { subject });
            }
            log_direct_access(facts.headers);
            return Decision::bare(DecisionOutcome::DenyDirectAccess);
        }

        if !forwarded && !self.config.require_auth_always {
            log_direct_access(facts.headers);
            return Decision::bare(DecisionOutcome::DenyDirectAccess);
        }

        let ctx = ForwardContext::from_headers(facts.headers);
        let mut cookies = Vec::with_capacity(1);
        match self.codec.encode(&ctx) {
            Ok(token) => cookies.push(self.codec.cookie(token)),
            Err(err) => warn!(error = %err, "redirect cookie not issued; caller will land on the default page"),
        }
        debug!(host = ?ctx.host, prefix = ?ctx.prefix, "unauthenticated request sent to login");
        let return_to = self.origin_or_landing(Some(&ctx));
        Decision::new(self.login_outcome(return_to), cookies)
    }

    /// Sign the caller out. Pending login state is dropped and the caller
    /// ends on the default landing page.
    #[must_use]
    pub fn decide_logout(&self) -> Decision {
        let return_to = self.config.landing_url();
        info!(return_to = %return_to, "signing out");
        Decision::new(DecisionOutcome::SignOut { return_to }, self.clear_login_state())
    }

    fn clear_login_state(&self) -> Vec<Cookie<'static>> {
        vec![
            self.codec.removal(),
            login_attempts::removal(&self.codec),
        ]
    }

    fn decide_callback(&self, status: &AuthStatus, facts: &RequestFacts<'_>) -> Decision {
        let clear_all = || self.clear_login_state();

        if !status.is_authenticated() {
            let attempts = login_attempts::read(&self.codec, facts.headers);
            if attempts >= self.config.max_login_attempts {
                warn!(attempts, "callback still unauthenticated; giving up on login");
                return Decision::new(
                    DecisionOutcome::LoginAttemptsExhausted { attempts },
                    clear_all(),
                );
            }
            debug!(attempt = attempts + 1, "callback unauthenticated; login re-triggered");
            let cookies = login_attempts::cookie(&self.codec, attempts.saturating_add(1))
                .into_iter()
                .collect();
            let pending = self.pending_context(facts.headers).ok();
            let return_to = self.origin_or_landing(pending.as_ref());
            return Decision::new(self.login_outcome(return_to), cookies);
        }

        let origin = self
            .pending_context(facts.headers)
            .and_then(|ctx| ctx.origin_url());

        let outcome = match origin {
            Ok(url) => {
                info!(url = %url, "login completed; returning to origin");
                DecisionOutcome::RedirectToOrigin { url }
            }
            Err(err) => {
                match &err {
                    DomainError::MissingForwardHeaders { .. } => {
                        debug!(error = %err, "destination incomplete; using default landing");
                    }
                    _ => warn!(error = %err, "redirect cookie rejected; using default landing"),
                }
                DecisionOutcome::RedirectToDefaultLanding {
                    url: self.config.landing_url(),
                }
            }
        };
        Decision::new(outcome, clear_all())
    }

    /// Destination stored in the redirect cookie by the general handler.
    fn pending_context(&self, headers: &HeaderMap) -> Result<ForwardContext, DomainError> {
        self.codec
            .decode_request(headers)
            .map_err(DomainError::from)
    }

    fn origin_or_landing(&self, ctx: Option<&ForwardContext>) -> String {
        ctx.and_then(|ctx| ctx.origin_url().ok())
            .unwrap_or_else(|| self.config.landing_url())
    }

    fn login_outcome(&self, return_to: String) -> DecisionOutcome {
        DecisionOutcome::RedirectToLogin {
            return_to,
            params: AuthorizationParams::default(),
        }
    }
}

fn log_direct_access(headers: &HeaderMap) {
    if let Err(err) = ForwardContext::from_headers(headers).origin_url() {
        debug!(error = %err, "request did not come through the proxy");
    }
}
