//! Cookie conventions shared by the engine and the oracle plugins.
//!
//! Every cookie the service issues is scoped to the common auth domain,
//! `HttpOnly`, `SameSite=Lax` and signed with HMAC-SHA256 under a key
//! derived from the operator-provided secret.

use cookie::time::Duration;
use cookie::{Cookie, CookieJar, Key, SameSite};

/// Shortest accepted cookie secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// The cookie secret is shorter than [`MIN_SECRET_LEN`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cookie secret must be at least {min} bytes, got {len}", min = MIN_SECRET_LEN)]
pub struct WeakSecret {
    pub len: usize,
}

/// Derive the signing key from an operator secret.
///
/// # Errors
///
/// Returns [`WeakSecret`] if `secret` is shorter than [`MIN_SECRET_LEN`].
pub fn derive_key(secret: &[u8]) -> Result<Key, WeakSecret> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(WeakSecret { len: secret.len() });
    }
    Ok(Key::derive_from(secret))
}

/// Sign `value` for cookie `name`, returning the signed cookie value.
#[must_use]
pub fn sign(key: &Key, name: &'static str, value: String) -> Option<String> {
    let mut jar = CookieJar::new();
    jar.signed_mut(key).add(Cookie::new(name, value));
    jar.get(name).map(|c| c.value().to_owned())
}

/// Verify a signed value for cookie `name` and return the plain value.
///
/// Returns `None` on any signature mismatch.
#[must_use]
pub fn verify(key: &Key, name: &'static str, signed_value: &str) -> Option<String> {
    let mut jar = CookieJar::new();
    jar.add_original(Cookie::new(name, signed_value.to_owned()));
    jar.signed(key).get(name).map(|c| c.value().to_owned())
}

/// Value of cookie `name` in a request's `Cookie` headers.
#[must_use]
pub fn find(headers: &http::HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_owned())
}

/// Domain and transport attributes applied to every issued cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieScope {
    domain: String,
    secure: bool,
}

impl CookieScope {
    #[must_use]
    pub fn new(domain: impl Into<String>, secure: bool) -> Self {
        Self {
            domain: domain.into(),
            secure,
        }
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Cookie `name=value` with the scope attributes and `Max-Age=max_age`.
    #[must_use]
    pub fn cookie(&self, name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .domain(self.domain.clone())
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(max_age)
            .build()
    }

    /// Removal cookie for `name` matching the attributes it was set with.
    #[must_use]
    pub fn removal(&self, name: &'static str) -> Cookie<'static> {
        let mut cookie = self.cookie(name, String::new(), Duration::ZERO);
        cookie.make_removal();
        cookie
    }
}
