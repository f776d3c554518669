//! Signed cookies holding the login transaction and the session.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use cookie::{Cookie, Key};
use fwd_auth_sdk::SessionOracleError;
use fwd_auth_sdk::cookies::{self, CookieScope};
use http::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use time::{Duration, OffsetDateTime};
use tracing::debug;

pub const TRANSACTION_COOKIE_NAME: &str = "_fwd_auth_txn";
pub const SESSION_COOKIE_NAME: &str = "_fwd_auth_session";

/// State of a login in flight, bound to the browser that started it.
#[derive(Serialize, serde::Deserialize)]
pub struct Transaction {
    pub state: String,
    pub nonce: String,
    pub pkce_verifier: String,
    pub redirect_uri: String,
}

/// An established session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct Session {
    pub sub: String,
    /// Expiry as a unix timestamp.
    pub exp: i64,
}

impl Session {
    #[must_use]
    pub fn new(sub: String, ttl: Duration) -> Self {
        Self {
            sub,
            exp: OffsetDateTime::now_utc()
                .checked_add(ttl)
                .map_or(i64::MAX, OffsetDateTime::unix_timestamp),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.exp > OffsetDateTime::now_utc().unix_timestamp()
    }
}

/// Seals serializable values into signed, domain-scoped cookies.
#[derive(Clone)]
pub struct SealedCookies {
    key: Key,
    scope: CookieScope,
}

impl SealedCookies {
    #[must_use]
    pub fn new(key: Key, scope: CookieScope) -> Self {
        Self { key, scope }
    }

    /// Serialize and sign `value` into cookie `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionOracleError::Internal`] if `value` cannot be
    /// serialized or signed.
    pub fn seal<T: Serialize>(
        &self,
        name: &'static str,
        value: &T,
        ttl: Duration,
    ) -> Result<Cookie<'static>, SessionOracleError> {
        let json =
            serde_json::to_vec(value).map_err(|e| SessionOracleError::Internal(e.to_string()))?;
        let signed = cookies::sign(&self.key, name, URL_SAFE_NO_PAD.encode(json))
            .ok_or_else(|| SessionOracleError::Internal(format!("failed to sign {name}")))?;
        Ok(self.scope.cookie(name, signed, ttl))
    }

    /// Verify and decode cookie `name` from a request. Forged or garbled
    /// cookies read as absent.
    #[must_use]
    pub fn open<T: DeserializeOwned>(&self, headers: &HeaderMap, name: &'static str) -> Option<T> {
        let raw = cookies::find(headers, name)?;
        let Some(payload) = cookies::verify(&self.key, name, &raw) else {
            debug!(cookie = name, "cookie signature mismatch");
            return None;
        };
        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&json).ok()
    }

    #[must_use]
    pub fn removal(&self, name: &'static str) -> Cookie<'static> {
        self.scope.removal(name)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http::HeaderValue;
    use http::header::COOKIE;

    fn sealed() -> SealedCookies {
        SealedCookies::new(
            cookies::derive_key(b"plugin-test-secret-0123456789abcdef").unwrap(),
            CookieScope::new("example.com", true),
        )
    }

    fn request_with(cookie: &Cookie<'_>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let pair = format!("{}={}", cookie.name(), cookie.value());
        headers.insert(COOKIE, HeaderValue::from_str(&pair).unwrap());
        headers
    }

    #[test]
    fn sealed_session_opens() {
        let sealed = sealed();
        let session = Session::new("auth0|abc123".to_owned(), Duration::hours(1));
        let cookie = sealed
            .seal(SESSION_COOKIE_NAME, &session, Duration::hours(1))
            .unwrap();

        let opened: Session = sealed.open(&request_with(&cookie), SESSION_COOKIE_NAME).unwrap();
        assert_eq!(opened, session);
        assert!(opened.is_active());
    }

    #[test]
    fn unsigned_session_is_ignored() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"mallory","exp":99999999999}"#);
        let forged = Cookie::new(SESSION_COOKIE_NAME, payload);
        let opened: Option<Session> = sealed().open(&request_with(&forged), SESSION_COOKIE_NAME);
        assert!(opened.is_none());
    }

    #[test]
    fn expired_session_is_inactive() {
        let session = Session {
            sub: "auth0|abc123".to_owned(),
            exp: OffsetDateTime::now_utc().unix_timestamp() - 1,
        };
        assert!(!session.is_active());
    }
}
