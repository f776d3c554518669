//! Server configuration.
//!
//! Values are layered as defaults, then the optional YAML file, then
//! environment variables and command-line flags (clap resolves those two).

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use figment::Figment;
use figment::providers::{Format, Serialized, Yaml};
use fwd_auth::ForwardAuthConfig;
use fwd_auth_sdk::cookies::MIN_SECRET_LEN;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Forward-auth sidecar for reverse proxies.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "fwd-auth-server", version, about, long_about = None)]
pub struct Cli {
    /// Port to run the service on.
    #[arg(short = 'p', long, env = "PORT")]
    pub port: Option<u16>,

    /// Port to serve /live, /health and /ready probes on.
    #[arg(long = "probes", env = "PROBES_PORT")]
    pub probes_port: Option<u16>,

    /// Secret for signing cookies. Generated at startup when unset.
    #[arg(long, env = "COOKIE_SECRET", hide_env_values = true)]
    pub cookie_secret: Option<String>,

    /// Path receiving identity provider responses.
    #[arg(long, env = "CALLBACK_PATH")]
    pub callback_path: Option<String>,

    /// Path that signs the caller out.
    #[arg(long, env = "LOGOUT_PATH")]
    pub logout_path: Option<String>,

    #[arg(long, env = "OIDC_CLIENT_ID")]
    pub oidc_client_id: Option<String>,

    #[arg(long, env = "OIDC_CLIENT_SECRET", hide_env_values = true)]
    pub oidc_client_secret: Option<String>,

    /// Public base URL of this service (e.g. `https://auth.example.com`).
    #[arg(long, env = "OIDC_BASE_URL")]
    pub oidc_base_url: Option<String>,

    /// OIDC issuer URL (e.g. `https://example.eu.auth0.com`).
    #[arg(long, env = "OIDC_ISSUER_URL")]
    pub oidc_issuer_url: Option<String>,

    /// Cookie domain shared by the auth host and the protected applications.
    #[arg(long, env = "COMMON_AUTH_DOMAIN")]
    pub common_auth_domain: Option<String>,

    /// YAML configuration file.
    #[arg(short = 'c', long = "config", env = "FWD_AUTH_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Session oracle backing the decision engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleKind {
    #[default]
    Oidc,
    /// Requires the `static-session` feature.
    Static,
}

/// Identity provider client settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OidcSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub issuer_url: Option<String>,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub port: u16,
    pub probes_port: u16,
    pub cookie_secret: Option<SecretString>,
    pub log_format: LogFormat,
    pub oracle: OracleKind,
    pub session_ttl_secs: u64,
    pub oidc: OidcSettings,
    pub forward_auth: ForwardAuthConfig,
    #[cfg(feature = "static-session")]
    pub static_session: static_session_plugin::StaticSessionPluginConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            probes_port: 9090,
            cookie_secret: None,
            log_format: LogFormat::default(),
            oracle: OracleKind::default(),
            session_ttl_secs: 24 * 60 * 60,
            oidc: OidcSettings::default(),
            forward_auth: ForwardAuthConfig::default(),
            #[cfg(feature = "static-session")]
            static_session: static_session_plugin::StaticSessionPluginConfig::default(),
        }
    }
}

/// Configuration errors. Any of these aborts startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("configuration file '{}' does not exist", .0.display())]
    FileNotFound(PathBuf),

    #[error(transparent)]
    ForwardAuth(#[from] fwd_auth::ConfigError),

    #[error("missing required configuration '{key}'")]
    Missing { key: &'static str },

    #[error("invalid configuration '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Values given on the command line or through the environment. Unset
/// values are skipped so they do not shadow the YAML file.
#[derive(Serialize)]
struct Overrides<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    probes_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cookie_secret: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_format: Option<LogFormat>,
    oidc: OidcOverrides<'a>,
    forward_auth: ForwardAuthOverrides<'a>,
}

#[derive(Serialize)]
struct OidcOverrides<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    client_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issuer_url: Option<&'a str>,
}

#[derive(Serialize)]
struct ForwardAuthOverrides<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logout_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    common_auth_domain: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    oidc_base_url: Option<&'a str>,
}

impl Cli {
    fn overrides(&self) -> Overrides<'_> {
        Overrides {
            port: self.port,
            probes_port: self.probes_port,
            cookie_secret: self.cookie_secret.as_deref(),
            log_format: self.log_format,
            oidc: OidcOverrides {
                client_id: self.oidc_client_id.as_deref(),
                client_secret: self.oidc_client_secret.as_deref(),
                issuer_url: self.oidc_issuer_url.as_deref(),
            },
            forward_auth: ForwardAuthOverrides {
                callback_path: self.callback_path.as_deref(),
                logout_path: self.logout_path.as_deref(),
                common_auth_domain: self.common_auth_domain.as_deref(),
                oidc_base_url: self.oidc_base_url.as_deref(),
            },
        }
    }
}

impl ServerConfig {
    /// Merge defaults, the YAML file named by `cli.config` and the
    /// command-line values, then validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the offending key.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut figment = Figment::new();
        if let Some(path) = &cli.config {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            figment = figment.merge(Yaml::file(path));
        }
        let config: Self = figment
            .merge(Serialized::defaults(cli.overrides()))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the keys required by the selected oracle.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.forward_auth.validate()?;

        if let Some(secret) = &self.cookie_secret {
            let len = secret.expose_secret().len();
            if len < MIN_SECRET_LEN {
                return Err(ConfigError::Invalid {
                    key: "cookie_secret",
                    reason: format!("must be at least {MIN_SECRET_LEN} bytes, got {len}"),
                });
            }
        }

        match self.oracle {
            OracleKind::Oidc => {
                require("oidc_client_id", self.oidc.client_id.as_deref())?;
                require(
                    "oidc_client_secret",
                    self.oidc.client_secret.as_ref().map(ExposeSecret::expose_secret),
                )?;
                require("oidc_issuer_url", self.oidc.issuer_url.as_deref())?;
            }
            OracleKind::Static => {
                if cfg!(not(feature = "static-session")) {
                    return Err(ConfigError::Invalid {
                        key: "oracle",
                        reason: "'static' needs the static-session feature".to_owned(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn require(key: &'static str, value: Option<&str>) -> Result<(), ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::Missing { key }),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn complete_cli() -> Cli {
        Cli {
            oidc_client_id: Some("client".to_owned()),
            oidc_client_secret: Some("secret".to_owned()),
            oidc_base_url: Some("https://auth.example.com".to_owned()),
            oidc_issuer_url: Some("https://idp.example.com".to_owned()),
            common_auth_domain: Some("example.com".to_owned()),
            ..Cli::default()
        }
    }

    #[test]
    fn defaults_are_applied() {
        let config = ServerConfig::load(&complete_cli()).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.probes_port, 9090);
        assert_eq!(config.forward_auth.callback_path, "/callback");
        assert_eq!(config.forward_auth.logout_path, "/logout");
        assert_eq!(config.oracle, OracleKind::Oidc);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.cookie_secret.is_none());
    }

    #[test]
    fn missing_client_id_is_named() {
        let cli = Cli {
            oidc_client_id: None,
            ..complete_cli()
        };
        let err = ServerConfig::load(&cli).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Missing {
                key: "oidc_client_id"
            }
        ));
    }

    #[test]
    fn missing_common_domain_is_named() {
        let cli = Cli {
            common_auth_domain: None,
            ..complete_cli()
        };
        let err = ServerConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("common_auth_domain"));
    }

    #[test]
    fn short_cookie_secret_is_rejected() {
        let cli = Cli {
            cookie_secret: Some("short".to_owned()),
            ..complete_cli()
        };
        let err = ServerConfig::load(&cli).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "cookie_secret",
                ..
            }
        ));
    }

    #[test]
    fn logout_path_is_overridden_from_cli() {
        let cli = Cli {
            logout_path: Some("/signout".to_owned()),
            ..complete_cli()
        };
        let config = ServerConfig::load(&cli).unwrap();
        assert_eq!(config.forward_auth.logout_path, "/signout");
    }

    #[test]
    fn missing_file_is_reported() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/fwd-auth.yaml")),
            ..complete_cli()
        };
        assert!(matches!(
            ServerConfig::load(&cli),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
