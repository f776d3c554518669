//! Domain models for the session oracle.

use cookie::Cookie;
use serde::{Deserialize, Serialize};

/// The two facts the decision engine observes about a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthStatus {
    is_authenticated: bool,
    subject: Option<String>,
}

impl AuthStatus {
    /// A caller with a valid session for `subject`.
    #[must_use]
    pub fn authenticated(subject: impl Into<String>) -> Self {
        Self {
            is_authenticated: true,
            subject: Some(subject.into()),
        }
    }

    /// A caller without a session.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Subject identifier asserted by the identity provider, if any.
    #[must_use]
    pub fn current_subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }
}

/// Fixed authorization request parameters sent with every login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationParams {
    pub response_type: String,
    /// How the provider returns the authorization response (`query` keeps it in the redirect URL).
    pub response_mode: String,
    /// Space separated scopes.
    pub scope: String,
}

impl Default for AuthorizationParams {
    fn default() -> Self {
        Self {
            response_type: "code".to_owned(),
            response_mode: "query".to_owned(),
            scope: "openid profile email offline_access".to_owned(),
        }
    }
}

impl AuthorizationParams {
    /// Scopes as individual values.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.split_whitespace()
    }
}

/// Input of [`crate::SessionOracleClient::login`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOptions {
    /// Where the caller was headed; the final destination once logged in.
    pub return_to: String,
    /// Callback URL the identity provider sends the authorization response to.
    pub redirect_uri: String,
    pub authorization_params: AuthorizationParams,
}

/// Redirect to the identity provider plus the cookies the oracle needs to
/// complete the flow later.
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    pub location: String,
    pub cookies: Vec<Cookie<'static>>,
}

/// Input of [`crate::SessionOracleClient::logout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOptions {
    /// Where the caller lands once signed out.
    pub return_to: String,
}

/// Redirect ending the session, usually through the identity provider, plus
/// the oracle cookies to clear.
#[derive(Debug, Clone)]
pub struct LogoutRedirect {
    pub location: String,
    pub cookies: Vec<Cookie<'static>>,
}

/// Result of completing a login on the callback path.
#[derive(Debug, Clone, Default)]
pub struct CallbackOutcome {
    pub status: AuthStatus,
    /// Cookies to set (session) or remove (transaction state).
    pub cookies: Vec<Cookie<'static>>,
}

impl CallbackOutcome {
    /// Outcome that only reports `status` without touching cookies.
    #[must_use]
    pub fn unchanged(status: AuthStatus) -> Self {
        Self {
            status,
            cookies: Vec::new(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn anonymous_status_has_no_subject() {
        let status = AuthStatus::anonymous();
        assert!(!status.is_authenticated());
        assert_eq!(status.current_subject(), None);
    }

    #[test]
    fn authenticated_status_exposes_subject() {
        let status = AuthStatus::authenticated("auth0|abc123");
        assert!(status.is_authenticated());
        assert_eq!(status.current_subject(), Some("auth0|abc123"));
    }

    #[test]
    fn default_params_request_offline_access() {
        let params = AuthorizationParams::default();
        assert_eq!(params.response_type, "code");
        assert_eq!(params.response_mode, "query");
        let scopes: Vec<&str> = params.scopes().collect();
        assert_eq!(scopes, ["openid", "profile", "email", "offline_access"]);
    }
}
