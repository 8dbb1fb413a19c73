//! Configuration validation.
//!
//! Serde handles syntax; this module checks the values make sense together.
//! Every problem is reported, not just the first.

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::AppConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.cas.server_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "cas.server_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("cas.server_url", e.to_string())),
    }

    if let Some(service_url) = &config.cas.service_url {
        if let Err(e) = Url::parse(service_url) {
            errors.push(ValidationError::new("cas.service_url", e.to_string()));
        }
    }

    if config.cas.validation_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "cas.validation_timeout_secs",
            "must be greater than zero",
        ));
    }

    if config.cas.session_ttl_secs == Some(0) {
        errors.push(ValidationError::new(
            "cas.session_ttl_secs",
            "must be greater than zero",
        ));
    }

    if !config.cas.logout_path.starts_with('/') {
        errors.push(ValidationError::new("cas.logout_path", "must start with '/'"));
    }

    let cookie_name = &config.cas.cookie.name;
    if cookie_name.is_empty()
        || !cookie_name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
    {
        errors.push(ValidationError::new(
            "cas.cookie.name",
            format!("'{}' is not a valid cookie name", cookie_name),
        ));
    }

    match config.cas.cookie.same_site.to_ascii_lowercase().as_str() {
        "strict" | "lax" => {}
        "none" if !config.cas.cookie.secure => errors.push(ValidationError::new(
            "cas.cookie.same_site",
            "'none' requires a secure cookie",
        )),
        "none" => {}
        other => errors.push(ValidationError::new(
            "cas.cookie.same_site",
            format!("unknown policy '{}'", other),
        )),
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than zero",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.cas.server_url = "not a url".into();
        config.cas.cookie.name = "bad name;".into();
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["cas.server_url", "cas.cookie.name", "timeouts.request_secs"]
        );
    }

    #[test]
    fn test_same_site_none_requires_secure() {
        let mut config = AppConfig::default();
        config.cas.cookie.same_site = "None".into();
        config.cas.cookie.secure = false;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "cas.cookie.same_site");
    }

    #[test]
    fn test_rejects_zero_session_ttl() {
        let mut config = AppConfig::default();
        config.cas.session_ttl_secs = Some(0);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "cas.session_ttl_secs");
    }

    #[test]
    fn test_rejects_non_http_server() {
        let mut config = AppConfig::default();
        config.cas.server_url = "ftp://sso.example.edu/cas/".into();
        assert!(validate_config(&config).is_err());
    }
}
