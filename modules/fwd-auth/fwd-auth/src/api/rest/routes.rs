//! Router and middleware stack of the main listener.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::routing::any;
use http::{HeaderName, Request, Response, StatusCode};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

use super::handlers;
use crate::module::ForwardAuth;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Callback and logout routes for every method, everything else to the
/// general handler.
#[must_use]
pub fn router(state: ForwardAuth) -> Router {
    let callback_path = state.engine.config().callback_path.clone();
    let logout_path = state.engine.config().logout_path.clone();
    let extra_headers = state.response_headers.clone();

    let router = Router::new()
        .route(&callback_path, any(handlers::callback))
        .route(&logout_path, any(handlers::logout))
        .fallback(handlers::forward_auth)
        .with_state(state);

    apply_middleware_stack(router, &extra_headers, REQUEST_TIMEOUT)
}

// Layers run outermost first, so they are added innermost first:
// SetRequestId -> PropagateRequestId -> Trace -> extra headers -> Timeout -> handlers
fn apply_middleware_stack(
    mut router: Router,
    extra_headers: &[(HeaderName, http::HeaderValue)],
    timeout: Duration,
) -> Router {
    router = router.layer(TimeoutLayer::with_status_code(
        StatusCode::GATEWAY_TIMEOUT,
        timeout,
    ));

    // Outside the timeout so 504 responses carry them too.
    for (name, value) in extra_headers {
        router = router.layer(SetResponseHeaderLayer::overriding(
            name.clone(),
            value.clone(),
        ));
    }

    router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request<Body>| {
                let rid = req
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("n/a");
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri().path(),
                    request_id = %rid,
                    status = Empty,
                    latency_ms = Empty,
                )
            })
            .on_response(
                |res: &Response<Body>, latency: Duration, span: &tracing::Span| {
                    span.record("status", res.status().as_u16());
                    span.record("latency_ms", latency.as_millis());
                },
            ),
    );

    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    router = router.layer(PropagateRequestIdLayer::new(x_request_id.clone()));
    router.layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
}
