//! CAS identity types and error definitions.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while talking to the CAS server.
#[derive(Debug, Error)]
pub enum CasError {
    /// Configured server URL could not be parsed.
    #[error("invalid CAS server URL: {0}")]
    InvalidServerUrl(#[source] url::ParseError),

    /// The service URL for a request could not be built.
    #[error("invalid service URL: {0}")]
    InvalidServiceUrl(String),

    /// Back-channel HTTP request failed.
    #[error("validation request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// CAS server answered with a non-200 status.
    #[error("CAS server returned status {0}")]
    UnexpectedStatus(u16),

    /// CAS server rejected the ticket.
    #[error("authentication failure ({code}): {message}")]
    AuthenticationFailure { code: String, message: String },

    /// Response was well-formed XML but not a recognizable service response.
    #[error("malformed CAS response: {0}")]
    MalformedResponse(String),

    /// Response was not well-formed XML.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Identity attributes released by the CAS server.
///
/// Iteration is sorted by key, so header emission is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Vec<String>>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values for `key`.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Successful ticket validation result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthenticationResponse {
    /// Authenticated principal.
    pub user: String,

    /// Proxy-granting ticket IOU, when the service asked for one.
    pub proxy_granting_ticket: Option<String>,

    /// Proxy chain, innermost first.
    pub proxies: Vec<String>,

    /// Raw `authenticationDate` as sent by the server.
    pub authentication_date: Option<String>,

    pub is_new_login: bool,

    pub is_remembered_login: bool,

    /// Group memberships from `memberOf`.
    pub member_of: Vec<String>,

    /// Remaining released attributes.
    pub attributes: Attributes,
}
