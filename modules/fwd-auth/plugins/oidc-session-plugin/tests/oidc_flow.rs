#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for the OIDC session plugin against a mocked provider.

use std::collections::HashMap;

use fwd_auth_sdk::{
    AuthStatus, AuthorizationParams, LoginOptions, LogoutOptions, SessionOracleError,
};
use http::header::COOKIE;
use http::request::Parts;
use http::{HeaderMap, HeaderValue, Request};
use httpmock::prelude::*;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use oidc_session_plugin::{OidcSessionPluginConfig, Service};
use secrecy::SecretString;
use serde_json::json;

const COOKIE_SECRET: &[u8] = b"oidc-plugin-test-secret-0123456789abcdef";
const CLIENT_ID: &str = "fwd-auth";
const RETURN_TO: &str = "https://app.example.com/dash";
const REDIRECT_URI: &str = "https://auth.example.com/callback";
const LANDING: &str = "https://home.example.com";
const SUBJECT: &str = "auth0|abc123";

const SIGNING_KEY_PEM: &[u8] = include_bytes!("fixtures/id_token_signing_key.pem");
const SIGNING_KEY_ID: &str = "test-key";
/// Public half of `SIGNING_KEY_PEM`.
const SIGNING_KEY_N: &str = "3IoLEann3k6yOlYdZg1L73d8fh3gZzZgSnKifmkp0CRW5JEGhFPchJIb37ZOVxKUb8JusiDPq69n7NkqPBccJhDtxrmkmvWgJzOAF_D_lfSURZqEyxIQzYamy3pS-dDcBMR38xPiYaCZTy4Od_O5irCOKBl9-p4Wduj1aWfKAt4W62rkr6xifT4MZ3MYQrxrztBLLd7Wxx1pBzn-KFEvfY-xPSzC7PEuFbGIDJ_dXys_CCYK40-OnW_YGvkclYOG-rPWJUD7m8rv-pnZxnKajlc1QQinyfPHblagfQ07eQn9Cyq1flZhTcPVW0m12aTyKamHBxjLvR9iqAsyQNIWJQ";
const SIGNING_KEY_E: &str = "AQAB";

struct Provider {
    server: MockServer,
}

impl Provider {
    async fn start() -> Self {
        Self {
            server: MockServer::start_async().await,
        }
    }

    fn issuer(&self) -> String {
        self.server.base_url()
    }

    /// Discovery without keys or sign-out support.
    async fn mock_discovery(&self) -> (httpmock::Mock<'_>, httpmock::Mock<'_>) {
        self.mock_metadata(json!({ "keys": [] }), false).await
    }

    /// Discovery serving the RS256 signing key and an `end_session_endpoint`.
    async fn mock_full_discovery(&self) -> (httpmock::Mock<'_>, httpmock::Mock<'_>) {
        let jwks = json!({
            "keys": [{
                "kty": "RSA",
                "use": "sig",
                "alg": "RS256",
                "kid": SIGNING_KEY_ID,
                "n": SIGNING_KEY_N,
                "e": SIGNING_KEY_E
            }]
        });
        self.mock_metadata(jwks, true).await
    }

    async fn mock_metadata(
        &self,
        keys: serde_json::Value,
        end_session: bool,
    ) -> (httpmock::Mock<'_>, httpmock::Mock<'_>) {
        let issuer = self.issuer();
        let mut document = json!({
            "issuer": issuer,
            "authorization_endpoint": format!("{issuer}/authorize"),
            "token_endpoint": format!("{issuer}/token"),
            "jwks_uri": format!("{issuer}/jwks"),
            "response_types_supported": ["code"],
            "subject_types_supported": ["public"],
            "id_token_signing_alg_values_supported": ["RS256"]
        });
        if end_session {
            document["end_session_endpoint"] = json!(format!("{issuer}/logout"));
        }
        let discovery = self
            .server
            .mock_async(|when, then| {
                when.method(GET).path("/.well-known/openid-configuration");
                then.status(200).json_body(document);
            })
            .await;
        let jwks = self
            .server
            .mock_async(|when, then| {
                when.method(GET).path("/jwks");
                then.status(200).json_body(keys);
            })
            .await;
        (discovery, jwks)
    }

    /// Token endpoint answering with an ID token for `SUBJECT` bound to `nonce`.
    async fn mock_token(&self, nonce: &str) -> httpmock::Mock<'_> {
        let id_token = self.id_token(nonce);
        self.server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(200).json_body(json!({
                    "access_token": "access-token",
                    "token_type": "Bearer",
                    "expires_in": 3600,
                    "id_token": id_token
                }));
            })
            .await
    }

    fn id_token(&self, nonce: &str) -> String {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let claims = json!({
            "iss": self.issuer(),
            "sub": SUBJECT,
            "aud": CLIENT_ID,
            "iat": now,
            "exp": now + 3600,
            "nonce": nonce
        });
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(SIGNING_KEY_ID.to_owned());
        let key = EncodingKey::from_rsa_pem(SIGNING_KEY_PEM).unwrap();
        jsonwebtoken::encode(&header, &claims, &key).unwrap()
    }

    fn service(&self) -> Service {
        let cfg = OidcSessionPluginConfig {
            secure_cookies: false,
            ..OidcSessionPluginConfig::new(
                self.issuer(),
                CLIENT_ID,
                SecretString::from("client-secret".to_owned()),
                "example.com",
            )
        };
        Service::from_config(&cfg, COOKIE_SECRET).unwrap()
    }
}

fn login_options() -> LoginOptions {
    LoginOptions {
        return_to: RETURN_TO.to_owned(),
        redirect_uri: REDIRECT_URI.to_owned(),
        authorization_params: AuthorizationParams::default(),
    }
}

fn logout_options() -> LogoutOptions {
    LogoutOptions {
        return_to: LANDING.to_owned(),
    }
}

fn cookie_headers(cookie: &cookie::Cookie<'_>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let pair = format!("{}={}", cookie.name(), cookie.value());
    headers.insert(COOKIE, HeaderValue::from_str(&pair).unwrap());
    headers
}

fn callback_parts(query: &str, cookie: Option<&cookie::Cookie<'_>>) -> Parts {
    let mut builder = Request::builder().uri(format!("/callback?{query}"));
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, format!("{}={}", cookie.name(), cookie.value()));
    }
    builder.body(()).unwrap().into_parts().0
}

fn query_of(location: &str) -> HashMap<String, String> {
    url::Url::parse(location)
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect()
}

#[tokio::test]
async fn login_redirects_to_authorization_endpoint() {
    let provider = Provider::start().await;
    provider.mock_discovery().await;
    let service = provider.service();

    let redirect = service.login(login_options()).await.unwrap();

    assert!(
        redirect
            .location
            .starts_with(&format!("{}/authorize?", provider.issuer()))
    );
    let query = query_of(&redirect.location);
    assert_eq!(query["response_type"], "code");
    assert_eq!(query["response_mode"], "query");
    assert_eq!(query["client_id"], CLIENT_ID);
    assert_eq!(query["redirect_uri"], REDIRECT_URI);
    assert_eq!(query["code_challenge_method"], "S256");
    assert!(query.contains_key("state"));
    assert!(query.contains_key("nonce"));
    let scopes: Vec<&str> = query["scope"].split(' ').collect();
    assert!(scopes.contains(&"openid"));
    assert!(scopes.contains(&"offline_access"));
    assert_eq!(scopes.iter().filter(|s| **s == "openid").count(), 1);

    assert_eq!(redirect.cookies.len(), 1);
    assert_eq!(redirect.cookies[0].name(), "_fwd_auth_txn");
    assert_eq!(redirect.cookies[0].domain(), Some("example.com"));
}

#[tokio::test]
async fn discovery_is_cached_after_first_success() {
    let provider = Provider::start().await;
    let (mut discovery, mut jwks) = provider.mock_discovery().await;
    let service = provider.service();

    service.login(login_options()).await.unwrap();
    discovery.delete_async().await;
    jwks.delete_async().await;

    assert!(service.login(login_options()).await.is_ok());
}

#[tokio::test]
async fn failed_discovery_is_unavailable_and_retried() {
    let provider = Provider::start().await;
    let service = provider.service();

    let err = service.login(login_options()).await.unwrap_err();
    assert!(matches!(err, SessionOracleError::Unavailable(_)));

    provider.mock_discovery().await;
    assert!(service.login(login_options()).await.is_ok());
}

#[tokio::test]
async fn callback_without_authorization_response_reports_current_status() {
    let provider = Provider::start().await;
    let service = provider.service();

    let outcome = service
        .complete_login(&callback_parts("", None))
        .await
        .unwrap();

    assert_eq!(outcome.status, AuthStatus::anonymous());
    assert!(outcome.cookies.is_empty());
}

#[tokio::test]
async fn provider_error_leaves_caller_unauthenticated() {
    let provider = Provider::start().await;
    let service = provider.service();

    let outcome = service
        .complete_login(&callback_parts(
            "error=access_denied&error_description=User%20cancelled",
            None,
        ))
        .await
        .unwrap();

    assert!(!outcome.status.is_authenticated());
    assert_eq!(outcome.cookies.len(), 1);
    assert_eq!(outcome.cookies[0].name(), "_fwd_auth_txn");
    assert_eq!(outcome.cookies[0].value(), "");
}

#[tokio::test]
async fn mismatched_state_is_not_exchanged() {
    let provider = Provider::start().await;
    provider.mock_discovery().await;
    provider
        .server
        .mock_async(|when, then| {
            when.method(POST).path("/token");
            then.status(500);
        })
        .await;
    let service = provider.service();

    let redirect = service.login(login_options()).await.unwrap();
    let outcome = service
        .complete_login(&callback_parts(
            "code=abc&state=forged",
            Some(&redirect.cookies[0]),
        ))
        .await
        .unwrap();

    assert!(!outcome.status.is_authenticated());
    assert_eq!(outcome.cookies[0].value(), "");
}

#[tokio::test]
async fn code_without_pending_login_is_not_exchanged() {
    let provider = Provider::start().await;
    let service = provider.service();

    let outcome = service
        .complete_login(&callback_parts("code=abc&state=xyz", None))
        .await
        .unwrap();

    assert!(!outcome.status.is_authenticated());
}

#[tokio::test]
async fn rejected_code_is_an_exchange_failure() {
    let provider = Provider::start().await;
    provider.mock_discovery().await;
    provider
        .server
        .mock_async(|when, then| {
            when.method(POST).path("/token");
            then.status(400).json_body(json!({
                "error": "invalid_grant",
                "error_description": "code expired"
            }));
        })
        .await;
    let service = provider.service();

    let redirect = service.login(login_options()).await.unwrap();
    let state = query_of(&redirect.location)["state"].clone();
    let err = service
        .complete_login(&callback_parts(
            &format!("code=abc&state={state}"),
            Some(&redirect.cookies[0]),
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionOracleError::Exchange(_)));
}

#[tokio::test]
async fn verified_id_token_establishes_session() {
    let provider = Provider::start().await;
    provider.mock_full_discovery().await;
    let service = provider.service();

    let redirect = service.login(login_options()).await.unwrap();
    let query = query_of(&redirect.location);
    provider.mock_token(&query["nonce"]).await;

    let outcome = service
        .complete_login(&callback_parts(
            &format!("code=abc&state={}", query["state"]),
            Some(&redirect.cookies[0]),
        ))
        .await
        .unwrap();

    assert_eq!(outcome.status, AuthStatus::authenticated(SUBJECT));
    assert_eq!(outcome.cookies.len(), 2);
    assert_eq!(outcome.cookies[0].name(), "_fwd_auth_txn");
    assert_eq!(outcome.cookies[0].value(), "");

    let session = &outcome.cookies[1];
    assert_eq!(session.name(), "_fwd_auth_session");
    assert_eq!(session.domain(), Some("example.com"));
    assert_eq!(session.http_only(), Some(true));
    assert_eq!(
        service.status(&cookie_headers(session)),
        AuthStatus::authenticated(SUBJECT)
    );
}

#[tokio::test]
async fn id_token_for_another_login_is_rejected() {
    let provider = Provider::start().await;
    provider.mock_full_discovery().await;
    let service = provider.service();

    let redirect = service.login(login_options()).await.unwrap();
    let state = query_of(&redirect.location)["state"].clone();
    provider.mock_token("nonce-of-another-login").await;

    let err = service
        .complete_login(&callback_parts(
            &format!("code=abc&state={state}"),
            Some(&redirect.cookies[0]),
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionOracleError::Exchange(_)));
}

#[tokio::test]
async fn logout_goes_through_end_session_endpoint() {
    let provider = Provider::start().await;
    provider.mock_full_discovery().await;
    let service = provider.service();

    let redirect = service.logout(logout_options()).await.unwrap();

    assert!(
        redirect
            .location
            .starts_with(&format!("{}/logout?", provider.issuer()))
    );
    let query = query_of(&redirect.location);
    assert_eq!(query["client_id"], CLIENT_ID);
    assert_eq!(query["post_logout_redirect_uri"], LANDING);

    let cleared: Vec<&str> = redirect.cookies.iter().map(|c| c.name()).collect();
    assert_eq!(cleared, ["_fwd_auth_session", "_fwd_auth_txn"]);
    assert!(redirect.cookies.iter().all(|c| c.value().is_empty()));
}

#[tokio::test]
async fn logout_without_end_session_endpoint_returns_directly() {
    let provider = Provider::start().await;
    provider.mock_discovery().await;
    let service = provider.service();

    let redirect = service.logout(logout_options()).await.unwrap();

    assert_eq!(redirect.location, LANDING);
    assert_eq!(redirect.cookies.len(), 2);
}

#[tokio::test]
async fn logout_still_clears_session_when_provider_is_down() {
    let provider = Provider::start().await;
    let service = provider.service();

    let redirect = service.logout(logout_options()).await.unwrap();

    assert_eq!(redirect.location, LANDING);
    assert!(redirect.cookies.iter().all(|c| c.value().is_empty()));
}
