//! CAS protocol client.
//!
//! # Responsibilities
//! - Build service, login, logout and validation URLs
//! - Validate service tickets over the back channel
//! - Own the ticket store and the session table, expiring sessions after
//!   the configured lifetime
//!
//! The client is shared behind an `Arc` by every middleware that needs it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, Request};
use dashmap::DashMap;
use url::Url;
use uuid::Uuid;

use crate::cas::request::{path_without_ticket, query_without_ticket};
use crate::cas::response::parse_service_response;
use crate::cas::store::{MemoryStore, TicketStore};
use crate::cas::types::{AuthenticationResponse, CasError};
use crate::config::CasConfig;
use crate::http::middleware::X_FORWARDED_PROTO;

const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// A browser session bound to a validated ticket.
struct Session {
    ticket: String,
    issued: Instant,
}

/// Client for a single CAS server.
pub struct CasClient {
    config: CasConfig,
    service_base: Option<Url>,
    login_endpoint: Url,
    logout_endpoint: Url,
    validate_endpoint: Url,
    http: reqwest::Client,
    tickets: Arc<dyn TicketStore>,
    /// Session id → service ticket.
    sessions: DashMap<String, Session>,
    ttl: Option<Duration>,
}

impl CasClient {
    /// Create a client with an in-memory ticket store.
    pub fn new(config: CasConfig) -> Result<Self, CasError> {
        let mut server = Url::parse(&config.server_url).map_err(CasError::InvalidServerUrl)?;
        if !server.path().ends_with('/') {
            let path = format!("{}/", server.path());
            server.set_path(&path);
        }

        let login_endpoint = server.join("login").map_err(CasError::InvalidServerUrl)?;
        let logout_endpoint = server.join("logout").map_err(CasError::InvalidServerUrl)?;
        let validate_endpoint = server
            .join(config.protocol.validate_path())
            .map_err(CasError::InvalidServerUrl)?;

        let service_base = config
            .service_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| CasError::InvalidServiceUrl(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.validation_timeout_secs))
            .build()?;

        let ttl = config.session_ttl();

        tracing::debug!(
            server = %server,
            protocol = ?config.protocol,
            session_ttl = ?ttl,
            "CAS client initialized"
        );

        Ok(Self {
            config,
            service_base,
            login_endpoint,
            logout_endpoint,
            validate_endpoint,
            http,
            tickets: Arc::new(MemoryStore::new()),
            sessions: DashMap::new(),
            ttl,
        })
    }

    /// Replace the ticket store.
    pub fn with_store(mut self, store: Arc<dyn TicketStore>) -> Self {
        self.tickets = store;
        self
    }

    pub fn config(&self) -> &CasConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TicketStore> {
        &self.tickets
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// The URL the CAS server should send the browser back to for `req`.
    pub fn service_url<B>(&self, req: &Request<B>) -> Result<Url, CasError> {
        let uri = req.uri();

        if let Some(base) = &self.service_base {
            let mut url = base.clone();
            let path = format!("{}{}", base.path().trim_end_matches('/'), uri.path());
            url.set_path(&path);
            let query = uri.query().map(query_without_ticket);
            url.set_query(query.as_deref().filter(|q| !q.is_empty()));
            return Ok(url);
        }

        let headers = req.headers();
        let scheme = first_value(headers, X_FORWARDED_PROTO)
            .or_else(|| uri.scheme_str().map(str::to_string))
            .unwrap_or_else(|| "http".to_string());
        let host = first_value(headers, X_FORWARDED_HOST)
            .or_else(|| first_value(headers, "host"))
            .or_else(|| uri.authority().map(|a| a.to_string()))
            .ok_or_else(|| CasError::InvalidServiceUrl("request carries no host".into()))?;

        Url::parse(&format!("{}://{}{}", scheme, host, path_without_ticket(uri)))
            .map_err(|e| CasError::InvalidServiceUrl(e.to_string()))
    }

    /// Login URL redirecting back to `service`.
    pub fn login_url(&self, service: &Url) -> Url {
        let mut url = self.login_endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("service", service.as_str());
            if self.config.renew {
                query.append_pair("renew", "true");
            }
            if self.config.gateway {
                query.append_pair("gateway", "true");
            }
        }
        url
    }

    /// Logout URL, naming `service` when configured to.
    pub fn logout_url(&self, service: Option<&Url>) -> Url {
        let mut url = self.logout_endpoint.clone();
        if let Some(service) = service.filter(|_| self.config.send_service) {
            url.query_pairs_mut().append_pair("service", service.as_str());
        }
        url
    }

    /// Back-channel validation URL.
    pub fn validation_url(&self, service: &Url, ticket: &str) -> Url {
        let mut url = self.validate_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("service", service.as_str())
            .append_pair("ticket", ticket);
        url
    }

    /// Exchange a service ticket for the identity it represents.
    pub async fn validate_ticket(
        &self,
        ticket: &str,
        service: &Url,
    ) -> Result<AuthenticationResponse, CasError> {
        tracing::debug!(service = %service, "Validating service ticket");

        let response = self.http.get(self.validation_url(service, ticket)).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(CasError::UnexpectedStatus(status.as_u16()));
        }

        let body = response.text().await?;
        parse_service_response(&body)
    }

    /// Identity bound to session `id`. Expired sessions and sessions whose
    /// ticket vanished are dropped.
    pub fn resolve_session(&self, id: &str) -> Option<AuthenticationResponse> {
        let (ticket, expired) = {
            let session = self.sessions.get(id)?;
            (session.ticket.clone(), self.is_expired(&session))
        };

        if expired {
            self.sessions.remove(id);
            self.tickets.delete(&ticket);
            tracing::debug!("CAS session expired");
            return None;
        }

        match self.tickets.read(&ticket) {
            Some(resp) => Some(resp),
            None => {
                self.sessions.remove(id);
                None
            }
        }
    }

    /// Record a validated ticket and bind a fresh session to it.
    pub fn start_session(&self, ticket: &str, response: AuthenticationResponse) -> String {
        self.prune_expired();

        let id = Uuid::new_v4().simple().to_string();
        self.tickets.write(ticket, response);
        self.sessions.insert(
            id.clone(),
            Session {
                ticket: ticket.to_string(),
                issued: Instant::now(),
            },
        );
        id
    }

    /// Drop every expired session and its ticket. Returns the number of
    /// sessions removed.
    pub fn prune_expired(&self) -> usize {
        if self.ttl.is_none() {
            return 0;
        }

        let mut expired = Vec::new();
        self.sessions.retain(|_, session| {
            if self.is_expired(session) {
                expired.push(session.ticket.clone());
                false
            } else {
                true
            }
        });

        for ticket in &expired {
            self.tickets.delete(ticket);
        }
        if !expired.is_empty() {
            tracing::debug!(sessions = expired.len(), "Pruned expired CAS sessions");
        }
        expired.len()
    }

    fn is_expired(&self, session: &Session) -> bool {
        self.ttl.is_some_and(|ttl| session.issued.elapsed() >= ttl)
    }

    /// End session `id` and forget its ticket.
    pub fn end_session(&self, id: &str) {
        if let Some((_, session)) = self.sessions.remove(id) {
            self.tickets.delete(&session.ticket);
        }
    }

    /// Forget `ticket` and every session bound to it. Returns the number of
    /// sessions removed.
    pub fn single_logout(&self, ticket: &str) -> usize {
        self.tickets.delete(ticket);
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            if session.ticket == ticket {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }
}

/// First comma-separated value of a header.
fn first_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
