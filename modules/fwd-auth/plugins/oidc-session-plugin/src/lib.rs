#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! OpenID Connect session oracle.
//!
//! Implements [`fwd_auth_sdk::SessionOracleClient`] against any
//! OIDC-compliant identity provider:
//!
//! - provider metadata discovered once and cached
//! - authorization code flow with PKCE, CSRF state and nonce kept in a
//!   signed transaction cookie
//! - the verified ID token subject kept in a signed session cookie scoped to
//!   the common auth domain
//! - sign-out through the provider's `end_session_endpoint` when advertised

pub mod config;
pub mod domain;

pub use config::OidcSessionPluginConfig;
pub use domain::service::Service;
