//! Structured logging.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to this
//! crate and to tower-http's request traces.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

/// Default filter directive for a log level.
pub fn default_directive(config: &ObservabilityConfig) -> String {
    format!("axum_cas={0},tower_http={0}", config.log_level)
}

/// Install the global subscriber.
pub fn init(config: &ObservabilityConfig) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive(config))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
