//! Capture of the original destination from proxy-injected headers.

use http::HeaderMap;
use serde::{Deserialize, Serialize};

use super::error::DomainError;

pub const X_FORWARDED_HOST: &str = "x-forwarded-host";
pub const X_FORWARDED_METHOD: &str = "x-forwarded-method";
pub const X_FORWARDED_PORT: &str = "x-forwarded-port";
pub const X_FORWARDED_PREFIX: &str = "x-forwarded-prefix";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Where the caller was originally headed, as reported by the proxy.
///
/// Every field may be absent. `host`, `proto` and `prefix` are needed to
/// rebuild a usable URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proto: Option<String>,
}

impl ForwardContext {
    /// Read the forwarding headers. Non-UTF-8 and empty values count as absent.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            host: header_value(headers, X_FORWARDED_HOST),
            method: header_value(headers, X_FORWARDED_METHOD),
            port: header_value(headers, X_FORWARDED_PORT),
            prefix: header_value(headers, X_FORWARDED_PREFIX),
            proto: header_value(headers, X_FORWARDED_PROTO),
        }
    }

    /// Rebuild `{proto}://{host}:{port}{prefix}`; `:{port}` is omitted when
    /// the port is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::MissingForwardHeaders`] naming the absent parts
    /// when `host`, `proto` or `prefix` is missing.
    pub fn origin_url(&self) -> Result<String, DomainError> {
        let (Some(proto), Some(host), Some(prefix)) = (&self.proto, &self.host, &self.prefix)
        else {
            return Err(DomainError::MissingForwardHeaders {
                missing: self.missing_parts().join(", "),
            });
        };
        Ok(match &self.port {
            Some(port) => format!("{proto}://{host}:{port}{prefix}"),
            None => format!("{proto}://{host}{prefix}"),
        })
    }

    fn missing_parts(&self) -> Vec<&'static str> {
        [
            (X_FORWARDED_PROTO, self.proto.is_none()),
            (X_FORWARDED_HOST, self.host.is_none()),
            (X_FORWARDED_PREFIX, self.prefix.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect()
    }
}

/// True when the proxy forwarded the request (`x-forwarded-host` and
/// `x-forwarded-prefix` both present).
#[must_use]
pub fn is_forwarded(headers: &HeaderMap) -> bool {
    header_value(headers, X_FORWARDED_HOST).is_some()
        && header_value(headers, X_FORWARDED_PREFIX).is_some()
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
