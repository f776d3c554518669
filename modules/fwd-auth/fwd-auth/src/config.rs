//! Configuration for the forward-auth decision engine.

use std::collections::BTreeMap;

use http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

/// Header carrying the authenticated subject to the proxy.
pub const DEFAULT_IDENTITY_HEADER: &str = "x-forwarded-user";

/// Forward-auth configuration.
///
/// Built once at startup and shared read-only by every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForwardAuthConfig {
    /// Path the identity provider redirects back to.
    pub callback_path: String,

    /// Path that ends the session and signs out of the identity provider.
    pub logout_path: String,

    /// Cookie domain shared by the auth host and the protected applications.
    pub common_auth_domain: String,

    /// Public base URL of this service (scheme and host, no path).
    pub oidc_base_url: String,

    /// Where callers go when the original destination cannot be recovered.
    /// Falls back to `https://<common_auth_domain>` when unset.
    pub default_landing_url: Option<String>,

    /// Response header naming the authenticated subject on allow.
    pub identity_header: String,

    /// When false, anonymous requests that were not forwarded by the proxy
    /// are denied instead of being sent to login.
    pub require_auth_always: bool,

    /// Headers added to every response of the main listener.
    pub extra_response_headers: BTreeMap<String, String>,

    /// Lifetime of the redirect and attempts cookies.
    pub redirect_cookie_ttl_secs: u64,

    /// Callback re-triggers allowed before giving up.
    pub max_login_attempts: u32,

    /// Emit the `Secure` attribute on every cookie.
    pub secure_cookies: bool,
}

impl Default for ForwardAuthConfig {
    fn default() -> Self {
        Self {
            callback_path: "/callback".to_owned(),
            logout_path: "/logout".to_owned(),
            common_auth_domain: String::new(),
            oidc_base_url: String::new(),
            default_landing_url: None,
            identity_header: DEFAULT_IDENTITY_HEADER.to_owned(),
            require_auth_always: true,
            extra_response_headers: BTreeMap::new(),
            redirect_cookie_ttl_secs: 600,
            max_login_attempts: 3,
            secure_cookies: true,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration '{key}'")]
    Missing { key: &'static str },

    #[error("invalid configuration '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ForwardAuthConfig {
    /// Check required keys and value formats.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.callback_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "callback_path",
                reason: format!("'{}' must start with '/'", self.callback_path),
            });
        }
        if !self.logout_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "logout_path",
                reason: format!("'{}' must start with '/'", self.logout_path),
            });
        }
        if self.logout_path == self.callback_path {
            return Err(ConfigError::Invalid {
                key: "logout_path",
                reason: "must differ from callback_path".to_owned(),
            });
        }
        if self.common_auth_domain.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "common_auth_domain",
            });
        }
        if self.oidc_base_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "oidc_base_url",
            });
        }
        parse_absolute_url("oidc_base_url", &self.oidc_base_url)?;
        if let Some(landing) = &self.default_landing_url {
            parse_absolute_url("default_landing_url", landing)?;
        }
        if self.max_login_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "max_login_attempts",
                reason: "must be at least 1".to_owned(),
            });
        }
        self.identity_header_name()?;
        self.response_headers()?;
        Ok(())
    }

    /// URL the identity provider sends the authorization response to.
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!(
            "{}{}",
            self.oidc_base_url.trim_end_matches('/'),
            self.callback_path
        )
    }

    /// Landing URL used when no destination can be reconstructed.
    #[must_use]
    pub fn landing_url(&self) -> String {
        match &self.default_landing_url {
            Some(url) => url.clone(),
            None => format!("https://{}", self.common_auth_domain.trim_start_matches('.')),
        }
    }

    /// Parsed identity header name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the name is not a valid header name.
    pub fn identity_header_name(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::try_from(self.identity_header.as_str()).map_err(|e| ConfigError::Invalid {
            key: "identity_header",
            reason: e.to_string(),
        })
    }

    /// Parsed `extra_response_headers`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first entry that is not a
    /// valid header name or value.
    pub fn response_headers(&self) -> Result<Vec<(HeaderName, HeaderValue)>, ConfigError> {
        self.extra_response_headers
            .iter()
            .map(|(name, value)| {
                let invalid = |reason: String| ConfigError::Invalid {
                    key: "extra_response_headers",
                    reason: format!("{name}: {reason}"),
                };
                let name = HeaderName::try_from(name.as_str()).map_err(|e| invalid(e.to_string()))?;
                let value =
                    HeaderValue::try_from(value.as_str()).map_err(|e| invalid(e.to_string()))?;
                Ok((name, value))
            })
            .collect()
    }
}

fn parse_absolute_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("'{raw}': {e}"),
    })?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("'{raw}' is not an absolute http(s) URL"),
        });
    }
    Ok(url)
}
