//! Callback orchestrator: route requests to the engine and the oracle.

use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use cookie::Cookie;
use fwd_auth_sdk::{LoginOptions, LogoutOptions};
use http::StatusCode;
use tracing::debug;

use super::problem::Problem;
use super::response::{allow, append_cookies, found, oracle_failure};
use super::views;
use crate::domain::decision::{Decision, DecisionOutcome, RequestFacts, Route};
use crate::module::ForwardAuth;

/// Every request that is not the callback path.
pub async fn forward_auth(State(state): State<ForwardAuth>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    let path = parts.uri.path();

    if let Some(rejected) = state.engine.guard_general_path(path) {
        return respond(&state, rejected, Vec::new()).await;
    }

    let status = match state.oracle.status(&parts).await {
        Ok(status) => status,
        Err(err) => return oracle_failure(&err),
    };
    let decision = state
        .engine
        .decide(Route::General, &status, &RequestFacts::new(path, &parts.headers));
    respond(&state, decision, Vec::new()).await
}

/// The identity provider's redirect back, for every method.
pub async fn callback(State(state): State<ForwardAuth>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    debug!(method = %parts.method, "auth callback");

    let completed = match state.oracle.complete_login(&parts).await {
        Ok(completed) => completed,
        Err(err) => return oracle_failure(&err),
    };
    let decision = state.engine.decide(
        Route::Callback,
        &completed.status,
        &RequestFacts::new(parts.uri.path(), &parts.headers),
    );
    respond(&state, decision, completed.cookies).await
}

/// Sign-out for every method.
pub async fn logout(State(state): State<ForwardAuth>) -> Response {
    let decision = state.engine.decide_logout();
    respond(&state, decision, Vec::new()).await
}

async fn respond(
    state: &ForwardAuth,
    decision: Decision,
    mut cookies: Vec<Cookie<'static>>,
) -> Response {
    let Decision {
        outcome,
        cookies: decided,
    } = decision;
    cookies.extend(decided);

    let mut response = match outcome {
        DecisionOutcome::Allow { subject } => allow(&state.identity_header, &subject),
        DecisionOutcome::DenyDirectAccess => (
            StatusCode::FORBIDDEN,
            views::direct_access_page(&state.engine.config().landing_url()),
        )
            .into_response(),
        DecisionOutcome::RedirectToLogin { return_to, params } => {
            let options = LoginOptions {
                return_to,
                redirect_uri: state.engine.config().callback_url(),
                authorization_params: params,
            };
            match state.oracle.login(options).await {
                Ok(redirect) => {
                    cookies.extend(redirect.cookies);
                    found(&redirect.location)
                }
                Err(err) => return oracle_failure(&err),
            }
        }
        DecisionOutcome::SignOut { return_to } => {
            match state.oracle.logout(LogoutOptions { return_to }).await {
                Ok(redirect) => {
                    cookies.extend(redirect.cookies);
                    found(&redirect.location)
                }
                Err(err) => return oracle_failure(&err),
            }
        }
        DecisionOutcome::RedirectToOrigin { url }
        | DecisionOutcome::RedirectToDefaultLanding { url } => found(&url),
        DecisionOutcome::LoginAttemptsExhausted { attempts } => Problem::new(
            StatusCode::BAD_GATEWAY,
            "Login could not be completed",
            format!("Sign-in did not complete after {attempts} attempts. Please try again later."),
        )
        .into_response(),
        DecisionOutcome::CallbackOnGeneralPath { path } => Problem::new(
            StatusCode::BAD_REQUEST,
            "Misrouted callback",
            format!("'{path}' is only served by the callback handler."),
        )
        .into_response(),
    };

    append_cookies(&mut response, &cookies);
    response
}
