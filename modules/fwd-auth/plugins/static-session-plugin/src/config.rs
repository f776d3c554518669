//! Configuration for the static session oracle.

use serde::Deserialize;

/// Plugin configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticSessionPluginConfig {
    /// Session mode.
    pub mode: SessionMode,

    /// Subject reported in `accept_all` mode.
    pub default_subject: String,

    /// Cookie-value-to-subject mappings for `static_sessions` mode.
    pub sessions: Vec<SessionMapping>,

    /// Page that hands out static session cookies. `return_to` is appended
    /// as a query parameter.
    pub login_url: Option<String>,
}

impl Default for StaticSessionPluginConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::AcceptAll,
            default_subject: "dev-user".to_owned(),
            sessions: Vec::new(),
            login_url: None,
        }
    }
}

/// Session mode.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Every caller is authenticated as the default subject.
    #[default]
    AcceptAll,
    /// Only mapped cookie values are authenticated.
    StaticSessions,
}

/// Maps a static session cookie value to a subject.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionMapping {
    pub value: String,
    pub subject: String,
}
