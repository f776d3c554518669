#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Forward-auth decision engine
//!
//! A reverse proxy forwards every inbound request here. The engine decides
//! whether the caller holds a valid session and either lets the proxy
//! forward the request or sends the caller through a login flow, bringing
//! them back to the original destination afterwards.
//!
//! - [`domain::forward_context`] - destination captured from `x-forwarded-*`
//! - [`domain::redirect_cookie`] - signed cookie carrying that destination
//! - [`domain::decision`] - the per-request decision
//! - [`api::rest`] - callback orchestrator, router and response writer

pub mod api;
pub mod config;
pub mod domain;
pub mod module;

pub use config::{ConfigError, ForwardAuthConfig};
pub use domain::decision::{Decision, DecisionEngine, DecisionOutcome, RequestFacts, Route};
pub use domain::error::DomainError;
pub use domain::forward_context::ForwardContext;
pub use domain::redirect_cookie::{InvalidCookie, RedirectCookieCodec};
pub use module::ForwardAuth;
