//! Service implementation for the OIDC session plugin.

use std::borrow::Cow;
use std::time::Duration as StdDuration;

use anyhow::Context;
use fwd_auth_sdk::cookies::{self, CookieScope};
use fwd_auth_sdk::{
    AuthStatus, CallbackOutcome, LoginOptions, LoginRedirect, LogoutOptions, LogoutRedirect,
    SessionOracleError,
};
use http::HeaderMap;
use http::request::Parts;
use openidconnect::core::{CoreClient, CoreResponseType};
use openidconnect::{
    AuthenticationFlow, AuthorizationCode, ClientId, ClientSecret, CsrfToken, IssuerUrl,
    LogoutRequest, Nonce, PkceCodeChallenge, PkceCodeVerifier, PostLogoutRedirectUrl,
    ProviderMetadataWithLogout, RedirectUrl, Scope, TokenResponse,
};
use secrecy::ExposeSecret;
use time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::session::{
    SESSION_COOKIE_NAME, SealedCookies, Session, TRANSACTION_COOKIE_NAME, Transaction,
};
use crate::config::OidcSessionPluginConfig;

/// OIDC client with endpoints set from discovered provider metadata.
type ConfiguredCoreClient = openidconnect::Client<
    openidconnect::EmptyAdditionalClaims,
    openidconnect::core::CoreAuthDisplay,
    openidconnect::core::CoreGenderClaim,
    openidconnect::core::CoreJweContentEncryptionAlgorithm,
    openidconnect::core::CoreJsonWebKey,
    openidconnect::core::CoreAuthPrompt,
    openidconnect::StandardErrorResponse<openidconnect::core::CoreErrorResponseType>,
    openidconnect::core::CoreTokenResponse,
    openidconnect::core::CoreTokenIntrospectionResponse,
    openidconnect::core::CoreRevocableToken,
    openidconnect::core::CoreRevocationErrorResponse,
    openidconnect::EndpointSet,
    openidconnect::EndpointNotSet,
    openidconnect::EndpointNotSet,
    openidconnect::EndpointNotSet,
    openidconnect::EndpointMaybeSet,
    openidconnect::EndpointMaybeSet,
>;

/// Authorization response parameters on the callback.
#[derive(Debug, Default)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackParams {
    fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();
        for (name, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            let slot = match name.as_ref() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            *slot = Some(value.into_owned());
        }
        params
    }
}

/// OIDC session service.
///
/// Holds no per-request state: pending logins live in the transaction
/// cookie and sessions in the session cookie.
pub struct Service {
    client_id: ClientId,
    client_secret: ClientSecret,
    issuer_url: IssuerUrl,
    session_ttl: Duration,
    transaction_ttl: Duration,
    sealed: SealedCookies,
    http_client: reqwest::Client,
    provider: OnceCell<ProviderMetadataWithLogout>,
}

impl Service {
    /// Create a service from plugin configuration and the cookie secret.
    ///
    /// Provider metadata is discovered on first use.
    ///
    /// # Errors
    /// Returns an error if the issuer URL is invalid, the cookie secret is
    /// too short or the HTTP client cannot be built.
    pub fn from_config(cfg: &OidcSessionPluginConfig, cookie_secret: &[u8]) -> anyhow::Result<Self> {
        let issuer_url = IssuerUrl::new(cfg.issuer_url.clone())
            .with_context(|| format!("invalid issuer URL '{}'", cfg.issuer_url))?;
        let key = cookies::derive_key(cookie_secret)?;

        // Redirects stay disabled so a token endpoint cannot bounce requests elsewhere.
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(StdDuration::from_secs(cfg.http_timeout_secs))
            .build()
            .context("failed to build OIDC HTTP client")?;

        Ok(Self {
            client_id: ClientId::new(cfg.client_id.clone()),
            client_secret: ClientSecret::new(cfg.client_secret.expose_secret().to_owned()),
            issuer_url,
            session_ttl: seconds(cfg.session_ttl_secs),
            transaction_ttl: seconds(cfg.transaction_ttl_secs),
            sealed: SealedCookies::new(
                key,
                CookieScope::new(cfg.common_auth_domain.clone(), cfg.secure_cookies),
            ),
            http_client,
            provider: OnceCell::new(),
        })
    }

    /// Provider metadata, discovered once. A failed discovery is retried on
    /// the next call.
    async fn provider(&self) -> Result<&ProviderMetadataWithLogout, SessionOracleError> {
        self.provider
            .get_or_try_init(|| async {
                let metadata = ProviderMetadataWithLogout::discover_async(
                    self.issuer_url.clone(),
                    &self.http_client,
                )
                .await
                        .map_err(|e| {
                            warn!(issuer = %self.issuer_url.url(), error = %e, "OIDC discovery failed");
                            SessionOracleError::Unavailable(format!("discovery failed: {e}"))
                        })?;
                info!(issuer = %self.issuer_url.url(), "OIDC provider metadata discovered");
                Ok::<_, SessionOracleError>(metadata)
            })
            .await
    }

    fn client(&self, metadata: &ProviderMetadataWithLogout) -> ConfiguredCoreClient {
        CoreClient::from_provider_metadata(
            metadata.clone(),
            self.client_id.clone(),
            Some(self.client_secret.clone()),
        )
    }

    /// Status carried by the session cookie.
    #[must_use]
    pub fn status(&self, headers: &HeaderMap) -> AuthStatus {
        match self.sealed.open::<Session>(headers, SESSION_COOKIE_NAME) {
            Some(session) if session.is_active() => AuthStatus::authenticated(session.sub),
            Some(session) => {
                debug!(subject = %session.sub, "session expired");
                AuthStatus::anonymous()
            }
            None => AuthStatus::anonymous(),
        }
    }

    /// Build the authorization request and the transaction cookie.
    ///
    /// # Errors
    /// - `Unavailable` if discovery fails
    /// - `Internal` if the redirect URI or parameters are unusable
    pub async fn login(&self, options: LoginOptions) -> Result<LoginRedirect, SessionOracleError> {
        let params = &options.authorization_params;
        if params.response_type != "code" {
            return Err(SessionOracleError::Internal(format!(
                "unsupported response_type '{}'",
                params.response_type
            )));
        }
        let redirect_uri = RedirectUrl::new(options.redirect_uri.clone())
            .map_err(|e| SessionOracleError::Internal(format!("invalid redirect_uri: {e}")))?;

        let client = self.client(self.provider().await?);
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        // `openid` is always requested by the authentication flow itself.
        let scopes = params
            .scopes()
            .filter(|s| *s != "openid")
            .map(|s| Scope::new(s.to_owned()));

        let (auth_url, csrf_token, nonce) = client
            .authorize_url(
                AuthenticationFlow::<CoreResponseType>::AuthorizationCode,
                CsrfToken::new_random,
                Nonce::new_random,
            )
            .set_redirect_uri(Cow::Owned(redirect_uri))
            .add_scopes(scopes)
            .add_extra_param("response_mode", params.response_mode.clone())
            .set_pkce_challenge(pkce_challenge)
            .url();

        let transaction = Transaction {
            state: csrf_token.secret().clone(),
            nonce: nonce.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
            redirect_uri: options.redirect_uri,
        };
        let cookie = self
            .sealed
            .seal(TRANSACTION_COOKIE_NAME, &transaction, self.transaction_ttl)?;

        debug!(return_to = %options.return_to, "login transaction started");
        Ok(LoginRedirect {
            location: auth_url.to_string(),
            cookies: vec![cookie],
        })
    }

    /// Complete the authorization response carried by the callback request.
    ///
    /// # Errors
    /// - `Exchange` if the token request or ID token verification fails
    /// - `Unavailable` if discovery fails
    /// - `Internal` if the token endpoint is not advertised
    pub async fn complete_login(&self, parts: &Parts) -> Result<CallbackOutcome, SessionOracleError> {
        let params = CallbackParams::from_query(parts.uri.query());
        let current = self.status(&parts.headers);

        if params.code.is_none() && params.error.is_none() {
            return Ok(CallbackOutcome::unchanged(current));
        }

        let clear_transaction = self.sealed.removal(TRANSACTION_COOKIE_NAME);

        if let Some(error) = &params.error {
            warn!(
                error = %error,
                description = params.error_description.as_deref().unwrap_or("none"),
                "identity provider returned an error"
            );
            return Ok(CallbackOutcome {
                status: current,
                cookies: vec![clear_transaction],
            });
        }

        let Some(transaction) = self
            .sealed
            .open::<Transaction>(&parts.headers, TRANSACTION_COOKIE_NAME)
        else {
            warn!("authorization response without a pending login");
            return Ok(CallbackOutcome {
                status: current,
                cookies: vec![clear_transaction],
            });
        };

        if params.state.as_deref() != Some(transaction.state.as_str()) {
            warn!("authorization response state does not match the pending login");
            return Ok(CallbackOutcome {
                status: current,
                cookies: vec![clear_transaction],
            });
        }

        let code = params.code.unwrap_or_default();
        let subject = self.exchange(code, transaction).await?;
        let session = Session::new(subject.clone(), self.session_ttl);
        let session_cookie = self
            .sealed
            .seal(SESSION_COOKIE_NAME, &session, self.session_ttl)?;

        info!(subject = %subject, "session established");
        Ok(CallbackOutcome {
            status: AuthStatus::authenticated(subject),
            cookies: vec![clear_transaction, session_cookie],
        })
    }

    /// Clear the session and send the caller through the provider's
    /// `end_session_endpoint` back to `options.return_to`.
    ///
    /// Without an advertised endpoint, or when discovery fails, only the
    /// local session ends and the caller goes straight to `return_to`.
    ///
    /// # Errors
    /// - `Internal` if `return_to` is not a valid URL
    pub async fn logout(&self, options: LogoutOptions) -> Result<LogoutRedirect, SessionOracleError> {
        let post_logout = PostLogoutRedirectUrl::new(options.return_to.clone())
            .map_err(|e| SessionOracleError::Internal(format!("invalid return_to: {e}")))?;
        let cookies = vec![
            self.sealed.removal(SESSION_COOKIE_NAME),
            self.sealed.removal(TRANSACTION_COOKIE_NAME),
        ];

        let end_session = match self.provider().await {
            Ok(metadata) => metadata.additional_metadata().end_session_endpoint.clone(),
            Err(err) => {
                warn!(error = %err, "provider sign-out skipped");
                None
            }
        };

        let location = match end_session {
            Some(endpoint) => LogoutRequest::from(endpoint)
                .set_client_id(self.client_id.clone())
                .set_post_logout_redirect_uri(post_logout)
                .http_get_url()
                .to_string(),
            None => {
                debug!("provider advertises no end_session_endpoint");
                options.return_to
            }
        };

        info!("session ended");
        Ok(LogoutRedirect { location, cookies })
    }

    async fn exchange(
        &self,
        code: String,
        transaction: Transaction,
    ) -> Result<String, SessionOracleError> {
        let client = self.client(self.provider().await?);
        let redirect_uri = RedirectUrl::new(transaction.redirect_uri)
            .map_err(|e| SessionOracleError::Internal(format!("invalid redirect URI: {e}")))?;

        let token_response = client
            .exchange_code(AuthorizationCode::new(code))
            .map_err(|e| SessionOracleError::Internal(format!("token endpoint not configured: {e}")))?
            .set_redirect_uri(Cow::Owned(redirect_uri))
            .set_pkce_verifier(PkceCodeVerifier::new(transaction.pkce_verifier))
            .request_async(&self.http_client)
            .await
            .map_err(|e| {
                warn!(error = %e, "token exchange failed");
                SessionOracleError::Exchange(e.to_string())
            })?;

        let id_token = token_response
            .id_token()
            .ok_or_else(|| SessionOracleError::Exchange("no ID token in response".to_owned()))?;
        let claims = id_token
            .claims(&client.id_token_verifier(), &Nonce::new(transaction.nonce))
            .map_err(|e| {
                warn!(error = %e, "ID token verification failed");
                SessionOracleError::Exchange(e.to_string())
            })?;

        Ok(claims.subject().as_str().to_owned())
    }
}

fn seconds(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}
