//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the CAS
//! adapter and its demo server. All types derive Serde traits for
//! deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// CAS client settings.
    pub cas: CasConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// CAS protocol revision used for ticket validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CasProtocol {
    /// `/serviceValidate`, no attribute release guaranteed.
    Cas2,
    /// `/p3/serviceValidate`, attributes included.
    #[default]
    Cas3,
}

impl CasProtocol {
    /// Path of the validation endpoint relative to the server URL.
    pub fn validate_path(&self) -> &'static str {
        match self {
            CasProtocol::Cas2 => "serviceValidate",
            CasProtocol::Cas3 => "p3/serviceValidate",
        }
    }
}

/// CAS client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CasConfig {
    /// Base URL of the CAS server (e.g., "https://sso.example.edu/cas/").
    pub server_url: String,

    /// Fixed public base URL of this service. When unset, the service URL is
    /// rebuilt from the forwarded headers of each request.
    pub service_url: Option<String>,

    /// Validation protocol revision.
    pub protocol: CasProtocol,

    /// Timeout for the back-channel validation call, in seconds.
    pub validation_timeout_secs: u64,

    /// Append `service` to the logout redirect.
    pub send_service: bool,

    /// Force re-authentication at the CAS server.
    pub renew: bool,

    /// Ask the CAS server not to prompt for credentials.
    pub gateway: bool,

    /// Path that ends the local session and redirects to CAS logout.
    pub logout_path: String,

    /// Upper bound on buffered form bodies inspected for single logout.
    pub max_logout_body_bytes: usize,

    /// Server-side session lifetime, in seconds. Falls back to the cookie's
    /// `max_age_secs`; sessions never expire when both are unset.
    pub session_ttl_secs: Option<u64>,

    /// Session cookie settings.
    pub cookie: CookieConfig,
}

impl Default for CasConfig {
    fn default() -> Self {
        Self {
            server_url: "https://localhost:8443/cas/".to_string(),
            service_url: None,
            protocol: CasProtocol::default(),
            validation_timeout_secs: 10,
            send_service: false,
            renew: false,
            gateway: false,
            logout_path: "/logout".to_string(),
            max_logout_body_bytes: 64 * 1024,
            session_ttl_secs: None,
            cookie: CookieConfig::default(),
        }
    }
}

impl CasConfig {
    /// Effective server-side session lifetime.
    pub fn session_ttl(&self) -> Option<Duration> {
        self.session_ttl_secs
            .or_else(|| {
                self.cookie
                    .max_age_secs
                    .and_then(|secs| u64::try_from(secs).ok())
            })
            .map(Duration::from_secs)
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Cookie name.
    pub name: String,

    /// Cookie path attribute.
    pub path: String,

    /// Optional cookie domain attribute.
    pub domain: Option<String>,

    /// Only send over HTTPS.
    pub secure: bool,

    /// Hide from scripts.
    pub http_only: bool,

    /// SameSite policy: "strict", "lax" or "none".
    pub same_site: String,

    /// Max-Age in seconds. Unset means a browser-session cookie.
    pub max_age_secs: Option<i64>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "_cas_session".to_string(),
            path: "/".to_string(),
            domain: None,
            secure: true,
            http_only: true,
            same_site: "lax".to_string(),
            max_age_secs: None,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [cas]
            server_url = "https://sso.example.edu/cas/"
            "#,
        )
        .unwrap();

        assert_eq!(config.cas.server_url, "https://sso.example.edu/cas/");
        assert_eq!(config.cas.protocol, CasProtocol::Cas3);
        assert_eq!(config.cas.cookie.name, "_cas_session");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.timeouts.request_secs, 30);
    }

    #[test]
    fn test_protocol_names() {
        let config: AppConfig = toml::from_str(
            r#"
            [cas]
            protocol = "cas2"
            "#,
        )
        .unwrap();

        assert_eq!(config.cas.protocol, CasProtocol::Cas2);
        assert_eq!(config.cas.protocol.validate_path(), "serviceValidate");
        assert_eq!(CasProtocol::Cas3.validate_path(), "p3/serviceValidate");
    }

    #[test]
    fn test_session_ttl_falls_back_to_cookie_max_age() {
        let mut config = CasConfig::default();
        assert_eq!(config.session_ttl(), None);

        config.cookie.max_age_secs = Some(3600);
        assert_eq!(config.session_ttl(), Some(Duration::from_secs(3600)));

        config.session_ttl_secs = Some(60);
        assert_eq!(config.session_ttl(), Some(Duration::from_secs(60)));

        config.session_ttl_secs = None;
        config.cookie.max_age_secs = Some(-1);
        assert_eq!(config.session_ttl(), None);
    }
}
