//! RFC 9457 problem details for error responses.

use axum::Json;
use axum::response::{IntoResponse, Response};
use fwd_auth_sdk::SessionOracleError;
use http::{HeaderValue, StatusCode, header};
use serde::Serialize;

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// Problem details body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
}

impl Problem {
    #[must_use]
    pub fn new(status: StatusCode, title: &str, detail: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank".to_owned(),
            title: title.to_owned(),
            status: status.as_u16(),
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, Json(self)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(PROBLEM_CONTENT_TYPE),
        );
        response
    }
}

impl From<&SessionOracleError> for Problem {
    fn from(e: &SessionOracleError) -> Self {
        match e {
            SessionOracleError::Exchange(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                "Login failed",
                "The identity provider response could not be verified. Please sign in again.",
            ),
            SessionOracleError::Unavailable(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Identity provider unavailable",
                "Sign-in is temporarily unavailable. Please retry shortly.",
            ),
            SessionOracleError::Internal(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error",
                "An unexpected error occurred.",
            ),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn oracle_errors_map_to_status_codes() {
        let cases = [
            (SessionOracleError::Exchange("bad code".to_owned()), 502),
            (SessionOracleError::Unavailable("down".to_owned()), 503),
            (SessionOracleError::Internal("boom".to_owned()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(Problem::from(&err).status, status);
        }
    }

    #[test]
    fn problem_detail_does_not_leak_oracle_message() {
        let problem = Problem::from(&SessionOracleError::Exchange("secret-code-xyz".to_owned()));
        assert!(!problem.detail.contains("secret-code-xyz"));
    }

    #[test]
    fn response_uses_problem_content_type() {
        let response = Problem::new(StatusCode::BAD_REQUEST, "Bad request", "nope").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            PROBLEM_CONTENT_TYPE
        );
    }
}
