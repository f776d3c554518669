//! Building blocks for turning decisions into HTTP responses.

use axum::response::{IntoResponse, Response};
use cookie::Cookie;
use fwd_auth_sdk::SessionOracleError;
use http::{HeaderName, HeaderValue, StatusCode, header};
use tracing::{error, warn};

use super::problem::Problem;

/// `302 Found` to `location`.
#[must_use]
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(e) => {
            error!(error = %e, "redirect target is not a valid header value");
            Problem::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error",
                "The redirect target could not be encoded.",
            )
            .into_response()
        }
    }
}

/// `200 OK` telling the proxy to forward the request as `subject`.
#[must_use]
pub fn allow(identity_header: &HeaderName, subject: &str) -> Response {
    let mut response = (StatusCode::OK, "OK").into_response();
    if subject.is_empty() {
        return response;
    }
    match HeaderValue::from_str(subject) {
        Ok(value) => {
            response.headers_mut().insert(identity_header.clone(), value);
        }
        Err(e) => warn!(error = %e, "subject is not a valid header value; identity header omitted"),
    }
    response
}

/// Problem response for a failed oracle call.
#[must_use]
pub fn oracle_failure(err: &SessionOracleError) -> Response {
    error!(error = %err, "session oracle call failed");
    Problem::from(err).into_response()
}

/// Append one `Set-Cookie` header per cookie.
pub fn append_cookies(response: &mut Response, cookies: &[Cookie<'static>]) {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!(cookie = cookie.name(), error = %e, "cookie dropped from response"),
        }
    }
}
