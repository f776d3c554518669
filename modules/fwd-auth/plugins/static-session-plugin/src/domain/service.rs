//! Service implementation for the static session oracle.

use std::collections::HashMap;

use fwd_auth_sdk::cookies;
use fwd_auth_sdk::{
    AuthStatus, LoginOptions, LoginRedirect, LogoutOptions, LogoutRedirect, SessionOracleError,
};
use http::HeaderMap;
use url::Url;

use crate::config::{SessionMode, StaticSessionPluginConfig};

pub const STATIC_SESSION_COOKIE_NAME: &str = "_fwd_auth_static";

/// Static session oracle.
///
/// - `accept_all`: every caller maps to the default subject
/// - `static_sessions`: the static session cookie maps to a configured subject
pub struct Service {
    mode: SessionMode,
    default_subject: String,
    sessions: HashMap<String, String>,
    login_url: Option<String>,
}

impl Service {
    /// Create a service from plugin configuration.
    #[must_use]
    pub fn from_config(cfg: &StaticSessionPluginConfig) -> Self {
        let sessions = cfg
            .sessions
            .iter()
            .map(|m| (m.value.clone(), m.subject.clone()))
            .collect();

        Self {
            mode: cfg.mode.clone(),
            default_subject: cfg.default_subject.clone(),
            sessions,
            login_url: cfg.login_url.clone(),
        }
    }

    #[must_use]
    pub fn status(&self, headers: &HeaderMap) -> AuthStatus {
        match self.mode {
            SessionMode::AcceptAll => AuthStatus::authenticated(self.default_subject.clone()),
            SessionMode::StaticSessions => cookies::find(headers, STATIC_SESSION_COOKIE_NAME)
                .and_then(|value| self.sessions.get(&value))
                .map_or_else(AuthStatus::anonymous, |subject| {
                    AuthStatus::authenticated(subject.clone())
                }),
        }
    }

    /// Redirect to the configured login page with `return_to` appended.
    ///
    /// # Errors
    ///
    /// Returns [`SessionOracleError::Internal`] when no usable login URL is
    /// configured.
    pub fn login(&self, options: &LoginOptions) -> Result<LoginRedirect, SessionOracleError> {
        let login_url = self.login_url.as_deref().ok_or_else(|| {
            SessionOracleError::Internal("static session oracle has no login_url".to_owned())
        })?;
        let mut location = Url::parse(login_url)
            .map_err(|e| SessionOracleError::Internal(format!("invalid login_url: {e}")))?;
        location
            .query_pairs_mut()
            .append_pair("return_to", &options.return_to);

        tracing::debug!(location = %location, "redirecting to static login page");
        Ok(LoginRedirect {
            location: location.into(),
            cookies: Vec::new(),
        })
    }

    /// Straight to `return_to`. The static cookie belongs to the login page,
    /// so nothing is cleared here.
    #[must_use]
    pub fn logout(&self, options: LogoutOptions) -> LogoutRedirect {
        tracing::debug!(mode = ?self.mode, "static session sign-out");
        LogoutRedirect {
            location: options.return_to,
            cookies: Vec::new(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use fwd_auth_sdk::AuthorizationParams;
    use http::HeaderValue;
    use http::header::COOKIE;

    use super::*;
    use crate::config::SessionMapping;

    fn static_sessions() -> StaticSessionPluginConfig {
        StaticSessionPluginConfig {
            mode: SessionMode::StaticSessions,
            sessions: vec![SessionMapping {
                value: "alice-session".to_owned(),
                subject: "alice".to_owned(),
            }],
            login_url: Some("https://login.example.com/start?tenant=dev".to_owned()),
            ..StaticSessionPluginConfig::default()
        }
    }

    fn with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn options() -> LoginOptions {
        LoginOptions {
            return_to: "https://app.example.com/dash".to_owned(),
            redirect_uri: "https://auth.example.com/callback".to_owned(),
            authorization_params: AuthorizationParams::default(),
        }
    }

    #[test]
    fn accept_all_authenticates_anyone() {
        let service = Service::from_config(&StaticSessionPluginConfig::default());
        let status = service.status(&HeaderMap::new());
        assert!(status.is_authenticated());
        assert_eq!(status.current_subject(), Some("dev-user"));
    }

    #[test]
    fn static_sessions_map_cookie_to_subject() {
        let service = Service::from_config(&static_sessions());
        let status = service.status(&with_cookie("other=1; _fwd_auth_static=alice-session"));
        assert_eq!(status, AuthStatus::authenticated("alice"));
    }

    #[test]
    fn static_sessions_reject_unknown_cookie() {
        let service = Service::from_config(&static_sessions());
        assert!(
            !service
                .status(&with_cookie("_fwd_auth_static=mallory"))
                .is_authenticated()
        );
        assert!(!service.status(&HeaderMap::new()).is_authenticated());
    }

    #[test]
    fn login_appends_return_to() {
        let service = Service::from_config(&static_sessions());
        let redirect = service.login(&options()).unwrap();
        assert_eq!(
            redirect.location,
            "https://login.example.com/start?tenant=dev&return_to=https%3A%2F%2Fapp.example.com%2Fdash"
        );
        assert!(redirect.cookies.is_empty());
    }

    #[test]
    fn logout_goes_straight_to_return_to() {
        let service = Service::from_config(&static_sessions());
        let redirect = service.logout(LogoutOptions {
            return_to: "https://home.example.com".to_owned(),
        });
        assert_eq!(redirect.location, "https://home.example.com");
        assert!(redirect.cookies.is_empty());
    }

    #[test]
    fn login_without_url_is_internal_error() {
        let service = Service::from_config(&StaticSessionPluginConfig::default());
        assert!(matches!(
            service.login(&options()),
            Err(SessionOracleError::Internal(_))
        ));
    }
}
