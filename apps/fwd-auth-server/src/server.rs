//! Wiring and lifecycle of the main and probe listeners.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use fwd_auth::ForwardAuth;
use fwd_auth_sdk::SessionOracleClient;
use oidc_session_plugin::OidcSessionPluginConfig;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{OracleKind, ServerConfig};
use crate::probes::{self, Readiness};

const GENERATED_SECRET_BYTES: usize = 64;

/// Failure to open a listening socket.
#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    #[error("port {port} is already in use")]
    AddrInUse { port: u16 },

    #[error("insufficient privileges to bind port {port}")]
    PermissionDenied { port: u16 },

    #[error("failed to bind port {port}: {source}")]
    Other {
        port: u16,
        #[source]
        source: io::Error,
    },
}

impl ListenError {
    /// Errors an operator can fix by changing the port or privileges.
    #[must_use]
    pub fn is_operator_error(&self) -> bool {
        matches!(self, Self::AddrInUse { .. } | Self::PermissionDenied { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error(transparent)]
    Listen(#[from] ListenError),

    #[error("server error: {0}")]
    Io(#[from] io::Error),
}

/// Bind `0.0.0.0:port`.
///
/// # Errors
///
/// Returns [`ListenError`] classifying the bind failure.
pub async fn bind(port: u16) -> Result<TcpListener, ListenError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr).await.map_err(|source| match source.kind() {
        io::ErrorKind::AddrInUse => ListenError::AddrInUse { port },
        io::ErrorKind::PermissionDenied => ListenError::PermissionDenied { port },
        _ => ListenError::Other { port, source },
    })
}

/// The configured cookie secret, or a random one when none is set.
#[must_use]
pub fn cookie_secret(config: &ServerConfig) -> Vec<u8> {
    if let Some(secret) = &config.cookie_secret {
        return secret.expose_secret().as_bytes().to_vec();
    }
    warn!("COOKIE_SECRET is not set, generated a random one; sessions will not survive a restart");
    let mut bytes = [0u8; GENERATED_SECRET_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes).into_bytes()
}

/// Instantiate the session oracle selected by `config.oracle`.
///
/// # Errors
///
/// Returns an error if the oracle settings are incomplete or invalid.
pub fn build_oracle(
    config: &ServerConfig,
    cookie_secret: &[u8],
) -> anyhow::Result<Arc<dyn SessionOracleClient>> {
    match config.oracle {
        OracleKind::Oidc => {
            let oidc = &config.oidc;
            let issuer_url = oidc.issuer_url.clone().context("missing oidc_issuer_url")?;
            let client_id = oidc.client_id.clone().context("missing oidc_client_id")?;
            let client_secret = oidc
                .client_secret
                .as_ref()
                .map(|s| SecretString::from(s.expose_secret().to_owned()))
                .context("missing oidc_client_secret")?;

            let plugin_config = OidcSessionPluginConfig {
                session_ttl_secs: config.session_ttl_secs,
                secure_cookies: config.forward_auth.secure_cookies,
                ..OidcSessionPluginConfig::new(
                    issuer_url,
                    client_id,
                    client_secret,
                    config.forward_auth.common_auth_domain.clone(),
                )
            };
            let service = oidc_session_plugin::Service::from_config(&plugin_config, cookie_secret)?;
            info!(issuer_url = %plugin_config.issuer_url, "using OIDC session oracle");
            Ok(Arc::new(service))
        }
        #[cfg(feature = "static-session")]
        OracleKind::Static => {
            warn!("using static session oracle; do not run this in production");
            Ok(Arc::new(static_session_plugin::Service::from_config(
                &config.static_session,
            )))
        }
        #[cfg(not(feature = "static-session"))]
        OracleKind::Static => {
            anyhow::bail!("the static session oracle needs the static-session feature")
        }
    }
}

/// Build the forward-auth state from `config`.
///
/// # Errors
///
/// Returns an error if the oracle or the forward-auth settings are invalid.
pub fn build(config: &ServerConfig) -> anyhow::Result<ForwardAuth> {
    let secret = cookie_secret(config);
    let oracle = build_oracle(config, &secret)?;
    ForwardAuth::new(config.forward_auth.clone(), &secret, oracle)
}

/// Bind both listeners and serve until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`ServeError::Listen`] if a port cannot be bound and
/// [`ServeError::Io`] if the main server fails.
pub async fn run(
    config: &ServerConfig,
    forward_auth: &ForwardAuth,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServeError> {
    let listener = bind(config.port).await?;
    let probe_listener = bind(config.probes_port).await?;
    serve(listener, probe_listener, forward_auth.router(), shutdown).await
}

/// Serve on already bound listeners until `shutdown` resolves.
///
/// Readiness is raised immediately and lowered when shutdown starts; probes
/// answer 503 while in-flight requests drain.
///
/// # Errors
///
/// Returns [`ServeError::Io`] if the main server fails.
pub async fn serve(
    listener: TcpListener,
    probe_listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServeError> {
    let cancel = CancellationToken::new();
    let readiness = Readiness::new();
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "forward-auth listening");
    }
    readiness.set_ready();

    let probes = tokio::spawn({
        let router = probes::router(&readiness);
        let cancel = cancel.clone();
        async move {
            axum::serve(probe_listener, router)
                .with_graceful_shutdown(cancel.cancelled_owned())
                .await
        }
    });

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown.await;
            cancel.cancel();
        }
    });

    let graceful = {
        let cancel = cancel.clone();
        async move {
            cancel.cancelled().await;
            readiness.set_not_ready();
            info!("HTTP server shutting down gracefully");
        }
    };
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(graceful)
        .await;

    cancel.cancel();
    match probes.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "probe listener failed"),
        Err(e) => warn!(error = %e, "probe listener task aborted"),
    }
    result.map_err(ServeError::Io)
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}
