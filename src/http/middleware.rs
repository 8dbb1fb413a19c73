//! CAS middleware adapter.
//!
//! [`CasMiddleware`] owns the CAS client and wraps a router in the steps a
//! CAS-protected app needs. Each method takes the router to protect (the
//! "next" handler) and returns it wrapped, so nesting calls reads in request
//! order:
//!
//! ```text
//! force_https(auth(remove_ticket(set_headers(app))))
//!
//! request → X-Forwarded-Proto: https
//!         → handle (ticket validation / session) → require_authentication
//!         → 302 to the clean URL if ?ticket= is still present
//!         → X-CAS-User / X-CAS-Attr-* → app
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::{from_fn, from_fn_with_state, Next},
    response::Response,
    Router,
};
use tower_http::set_header::SetRequestHeaderLayer;

use crate::cas::middleware::{handle, require_authentication};
use crate::cas::request::{authentication_response, path_without_ticket, ticket};
use crate::cas::{CasClient, CasError};
use crate::config::CasConfig;
use crate::http::response::found;

pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_CAS_USER: &str = "x-cas-user";
pub const X_CAS_ATTR_PREFIX: &str = "x-cas-attr-";

/// Adapter wiring a [`CasClient`] into an axum router.
#[derive(Clone)]
pub struct CasMiddleware {
    client: Arc<CasClient>,
}

impl CasMiddleware {
    /// Build the adapter and its CAS client from configuration.
    pub fn new(config: CasConfig) -> Result<Self, CasError> {
        Ok(Self::from_client(CasClient::new(config)?))
    }

    /// Wrap an already-built client.
    pub fn from_client(client: CasClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn cas_client(&self) -> &Arc<CasClient> {
        &self.client
    }

    /// Mark every request as having arrived over HTTPS, so the service URL
    /// handed to the CAS server uses the right scheme behind a TLS terminator
    /// or during local development.
    pub fn force_https<S>(&self, next: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        next.layer(SetRequestHeaderLayer::overriding(
            HeaderName::from_static(X_FORWARDED_PROTO),
            HeaderValue::from_static("https"),
        ))
    }

    /// Establish the CAS session, then require it. Must sit outside
    /// [`remove_ticket`](Self::remove_ticket).
    pub fn auth<S>(&self, next: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.authn_only(self.require_cas(next))
    }

    /// Ticket validation and session lookup only; never redirects to login.
    pub fn authn_only<S>(&self, next: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        next.layer(from_fn_with_state(self.client.clone(), handle))
    }

    /// Redirect to login unless an earlier layer authenticated the request.
    pub fn require_cas<S>(&self, next: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        next.layer(from_fn_with_state(self.client.clone(), require_authentication))
    }

    /// Redirect `?ticket=` URLs to the same URL without it. The session
    /// cookie set during validation rides along on the redirect.
    pub fn remove_ticket<S>(&self, next: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        next.layer(from_fn(remove_ticket_param))
    }

    /// Copy the resolved identity into `X-CAS-User` and `X-CAS-Attr-*`.
    pub fn set_headers<S>(&self, next: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        next.layer(from_fn(set_identity_headers))
    }

    /// Every step, in the only order that works.
    pub fn all<S>(&self, next: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.force_https(self.auth(self.remove_ticket(self.set_headers(next))))
    }
}

async fn remove_ticket_param(request: Request<Body>, next: Next) -> Response {
    if ticket(request.uri()).is_none() {
        return next.run(request).await;
    }

    let location = path_without_ticket(request.uri());
    tracing::debug!(location = %location, "Stripping ticket from URL");
    found(&location)
}

async fn set_identity_headers(mut request: Request<Body>, next: Next) -> Response {
    let mut identity = Vec::new();
    if let Some(resp) = authentication_response(&request) {
        match HeaderValue::from_str(&resp.user) {
            Ok(value) => identity.push((HeaderName::from_static(X_CAS_USER), value)),
            Err(_) => tracing::warn!("CAS username is not a valid header value"),
        }
        for (key, values) in resp.attributes.iter() {
            let Some(first) = values.first() else { continue };
            let name = HeaderName::from_bytes(format!("{}{}", X_CAS_ATTR_PREFIX, key).as_bytes());
            match (name, HeaderValue::from_str(first)) {
                (Ok(name), Ok(value)) => identity.push((name, value)),
                _ => tracing::warn!(attribute = %key, "Skipping attribute not representable as a header"),
            }
        }
    }

    let headers = request.headers_mut();
    let spoofed: Vec<HeaderName> = headers
        .keys()
        .filter(|name| {
            name.as_str() == X_CAS_USER || name.as_str().starts_with(X_CAS_ATTR_PREFIX)
        })
        .cloned()
        .collect();
    for name in spoofed {
        headers.remove(&name);
    }
    for (name, value) in identity {
        headers.insert(name, value);
    }

    next.run(request).await
}
