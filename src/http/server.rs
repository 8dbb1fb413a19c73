//! Demo HTTP server.
//!
//! # Responsibilities
//! - Create Axum Router with an identity echo handler behind CAS
//! - Keep a health probe outside the CAS chain
//! - Wire up middleware (tracing, timeout)
//! - Bind server to listener with graceful shutdown

use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    http::{HeaderMap, StatusCode},
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::cas::{CasError, CasPrincipal};
use crate::config::AppConfig;
use crate::http::middleware::{CasMiddleware, X_CAS_ATTR_PREFIX, X_CAS_USER};

/// HTTP server exposing a CAS-protected "whoami" endpoint.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    cas: CasMiddleware,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig) -> Result<Self, CasError> {
        let cas = CasMiddleware::new(config.cas.clone())?;
        let router = Self::build_router(&config, &cas);
        Ok(Self { router, config, cas })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &AppConfig, cas: &CasMiddleware) -> Router {
        let protected = cas.all(
            Router::new()
                .route("/", any(whoami))
                .route("/{*path}", any(whoami)),
        );

        Router::new()
            .route("/healthz", get(health))
            .merge(protected)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            cas_server = %self.config.cas.server_url,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!(
            sessions = self.cas.cas_client().session_count(),
            "HTTP server stopped"
        );
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Echo the identity as the protected app sees it.
async fn whoami(CasPrincipal(identity): CasPrincipal, headers: HeaderMap) -> Json<Value> {
    let forwarded: BTreeMap<&str, &str> = headers
        .iter()
        .filter(|(name, _)| {
            name.as_str() == X_CAS_USER || name.as_str().starts_with(X_CAS_ATTR_PREFIX)
        })
        .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
        .collect();

    Json(json!({
        "user": identity.user,
        "attributes": identity.attributes,
        "member_of": identity.member_of,
        "headers": forwarded,
    }))
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
