#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Static session oracle
//!
//! Answers session status from configuration instead of an identity
//! provider. Meant for development and end-to-end tests.
//!
//! ## Modes
//!
//! - **`accept_all`** (default): every caller is authenticated as the
//!   configured default subject.
//!
//! - **`static_sessions`**: the value of the `_fwd_auth_static` cookie is
//!   looked up in a fixed table of sessions. Unknown or missing values are
//!   anonymous.
//!
//! ## Configuration
//!
//! ```yaml
//! static_session:
//!   mode: static_sessions
//!   default_subject: "dev-user"
//!   login_url: "https://login.dev.example.com/"
//!   sessions:
//!     - value: "alice-session"
//!       subject: "alice"
//! ```

pub mod config;
pub mod domain;

pub use config::StaticSessionPluginConfig;
pub use domain::service::Service;
