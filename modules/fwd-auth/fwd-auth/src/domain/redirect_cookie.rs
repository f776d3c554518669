//! Tamper-resistant cookie carrying the original destination across the
//! login round trip.
//!
//! Value layout: `base64(HMAC-SHA256) || payload` where
//! `payload = base64url(json(ForwardContext))`. The signature is checked
//! before anything is decoded.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use cookie::time::Duration;
use cookie::{Cookie, Key};
use fwd_auth_sdk::cookies::{self, CookieScope};
use http::HeaderMap;

use super::error::DomainError;
use super::forward_context::ForwardContext;

pub const REDIRECT_COOKIE_NAME: &str = "_fwd_auth_redir";

/// Why a redirect cookie could not be turned back into a [`ForwardContext`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCookie {
    #[error("redirect cookie is missing")]
    Missing,

    #[error("redirect cookie signature mismatch")]
    BadSignature,

    #[error("redirect cookie payload is malformed: {0}")]
    Malformed(String),
}

/// Encodes and verifies the redirect cookie.
#[derive(Clone)]
pub struct RedirectCookieCodec {
    key: Key,
    scope: CookieScope,
    ttl: Duration,
}

impl RedirectCookieCodec {
    #[must_use]
    pub fn new(key: Key, scope: CookieScope, ttl: Duration) -> Self {
        Self { key, scope, ttl }
    }

    /// Build a codec from the raw cookie secret.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::WeakCookieSecret`] if the secret is too short.
    pub fn from_secret(
        secret: &[u8],
        scope: CookieScope,
        ttl: Duration,
    ) -> Result<Self, DomainError> {
        Ok(Self::new(cookies::derive_key(secret)?, scope, ttl))
    }

    pub(crate) fn key(&self) -> &Key {
        &self.key
    }

    pub(crate) fn scope(&self) -> &CookieScope {
        &self.scope
    }

    pub(crate) fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Serialize and sign `ctx` into a cookie value.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Internal`] if serialization or signing fails.
    pub fn encode(&self, ctx: &ForwardContext) -> Result<String, DomainError> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(ctx)?);
        cookies::sign(&self.key, REDIRECT_COOKIE_NAME, payload)
            .ok_or_else(|| DomainError::Internal("failed to sign redirect cookie".to_owned()))
    }

    /// Verify and decode a cookie value produced by [`Self::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCookie::BadSignature`] when the value was not signed
    /// with this key or was altered, [`InvalidCookie::Malformed`] when the
    /// signed payload does not decode.
    pub fn decode(&self, token: &str) -> Result<ForwardContext, InvalidCookie> {
        let payload = cookies::verify(&self.key, REDIRECT_COOKIE_NAME, token)
            .ok_or(InvalidCookie::BadSignature)?;
        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| InvalidCookie::Malformed(e.to_string()))?;
        serde_json::from_slice(&json).map_err(|e| InvalidCookie::Malformed(e.to_string()))
    }

    /// Decode the redirect cookie carried by a request.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCookie::Missing`] when the request has no redirect
    /// cookie, otherwise whatever [`Self::decode`] reports.
    pub fn decode_request(&self, headers: &HeaderMap) -> Result<ForwardContext, InvalidCookie> {
        let token = cookies::find(headers, REDIRECT_COOKIE_NAME).ok_or(InvalidCookie::Missing)?;
        self.decode(&token)
    }

    /// The `Set-Cookie` carrying an encoded token.
    #[must_use]
    pub fn cookie(&self, token: String) -> Cookie<'static> {
        self.scope.cookie(REDIRECT_COOKIE_NAME, token, self.ttl)
    }

    /// The `Set-Cookie` clearing the redirect cookie.
    #[must_use]
    pub fn removal(&self) -> Cookie<'static> {
        self.scope.removal(REDIRECT_COOKIE_NAME)
    }
}
