//! Configuration for the OIDC session plugin.

use secrecy::SecretString;

/// Plugin configuration.
#[derive(Debug, Clone)]
pub struct OidcSessionPluginConfig {
    /// Issuer URL; discovery reads `<issuer>/.well-known/openid-configuration`.
    pub issuer_url: String,

    pub client_id: String,

    pub client_secret: SecretString,

    /// Cookie domain shared with the protected applications.
    pub common_auth_domain: String,

    /// Lifetime of an established session.
    pub session_ttl_secs: u64,

    /// Lifetime of a pending login (state, nonce, PKCE verifier).
    pub transaction_ttl_secs: u64,

    /// Emit the `Secure` attribute on cookies.
    pub secure_cookies: bool,

    /// Timeout for discovery and token requests.
    pub http_timeout_secs: u64,
}

impl OidcSessionPluginConfig {
    pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
    pub const DEFAULT_TRANSACTION_TTL_SECS: u64 = 10 * 60;
    pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

    /// Configuration with default lifetimes and secure cookies.
    #[must_use]
    pub fn new(
        issuer_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
        common_auth_domain: impl Into<String>,
    ) -> Self {
        Self {
            issuer_url: issuer_url.into(),
            client_id: client_id.into(),
            client_secret,
            common_auth_domain: common_auth_domain.into(),
            session_ttl_secs: Self::DEFAULT_SESSION_TTL_SECS,
            transaction_ttl_secs: Self::DEFAULT_TRANSACTION_TTL_SECS,
            secure_cookies: true,
            http_timeout_secs: Self::DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}
