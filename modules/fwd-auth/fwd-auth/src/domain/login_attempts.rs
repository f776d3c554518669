//! Counter of consecutive login re-triggers from the callback path.
//!
//! Kept in a signed cookie next to the redirect cookie so a caller bouncing
//! between the identity provider and the callback is cut off eventually.

use cookie::Cookie;
use fwd_auth_sdk::cookies;
use http::HeaderMap;

use super::redirect_cookie::RedirectCookieCodec;

pub const ATTEMPTS_COOKIE_NAME: &str = "_fwd_auth_attempts";

/// Attempts recorded so far. Missing, forged or garbled cookies count as zero.
#[must_use]
pub fn read(codec: &RedirectCookieCodec, headers: &HeaderMap) -> u32 {
    cookies::find(headers, ATTEMPTS_COOKIE_NAME)
        .and_then(|raw| cookies::verify(codec.key(), ATTEMPTS_COOKIE_NAME, &raw))
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

/// The `Set-Cookie` recording `attempts`.
#[must_use]
pub fn cookie(codec: &RedirectCookieCodec, attempts: u32) -> Option<Cookie<'static>> {
    let signed = cookies::sign(codec.key(), ATTEMPTS_COOKIE_NAME, attempts.to_string())?;
    Some(codec.scope().cookie(ATTEMPTS_COOKIE_NAME, signed, codec.ttl()))
}

/// The `Set-Cookie` clearing the counter.
#[must_use]
pub fn removal(codec: &RedirectCookieCodec) -> Cookie<'static> {
    codec.scope().removal(ATTEMPTS_COOKIE_NAME)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::redirect_cookie::tests::codec;
    use http::HeaderValue;
    use http::header::COOKIE;

    fn request_with(cookie: &Cookie<'_>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let pair = format!("{}={}", cookie.name(), cookie.value());
        headers.insert(COOKIE, HeaderValue::from_str(&pair).unwrap());
        headers
    }

    #[test]
    fn absent_counter_reads_zero() {
        assert_eq!(read(&codec(), &HeaderMap::new()), 0);
    }

    #[test]
    fn counter_survives_round_trip() {
        let codec = codec();
        let cookie = cookie(&codec, 2).unwrap();
        assert_eq!(read(&codec, &request_with(&cookie)), 2);
    }

    #[test]
    fn unsigned_counter_reads_zero() {
        let forged = Cookie::new(ATTEMPTS_COOKIE_NAME, "99");
        assert_eq!(read(&codec(), &request_with(&forged)), 0);
    }
}
