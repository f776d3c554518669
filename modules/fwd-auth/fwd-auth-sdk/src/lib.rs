#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Forward-auth SDK
//!
//! This crate provides the contract between the forward-auth decision
//! engine and the session oracle that owns the identity-provider session:
//!
//! - [`SessionOracleClient`] - API trait implemented by oracle plugins
//! - [`AuthStatus`] - Authentication facts observed by the engine
//! - [`LoginOptions`] / [`AuthorizationParams`] - Login trigger inputs
//! - [`LogoutOptions`] - Sign-out inputs
//! - [`LoginRedirect`] / [`LogoutRedirect`] / [`CallbackOutcome`] - Oracle results with cookie mutations
//! - [`SessionOracleError`] - Error types
//! - [`cookies`] - Signed, domain-scoped cookie helpers
//!
//! ## Usage
//!
//! ```ignore
//! use fwd_auth_sdk::SessionOracleClient;
//!
//! let status = oracle.status(&parts).await?;
//! if !status.is_authenticated() {
//!     let redirect = oracle.login(options).await?;
//! }
//! ```

pub mod api;
pub mod cookies;
pub mod error;
pub mod models;

// Re-export main types at crate root
pub use api::SessionOracleClient;
pub use error::SessionOracleError;
pub use models::{
    AuthStatus, AuthorizationParams, CallbackOutcome, LoginOptions, LoginRedirect, LogoutOptions,
    LogoutRedirect,
};
