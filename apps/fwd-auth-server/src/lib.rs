#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Forward-auth sidecar server.
//!
//! Runs the forward-auth router on the main port and liveness/readiness
//! probes on a second port.

pub mod config;
pub mod logging;
pub mod probes;
pub mod server;
