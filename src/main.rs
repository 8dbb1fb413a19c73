//! CAS-protected identity echo server.
//!
//! # Architecture Overview
//!
//! ```text
//!   Browser                      axum-cas                            CAS server
//!   ───────                      ────────                            ──────────
//!   GET /page ──────────────▶ force_https → handle → require ──302──▶ /login
//!   GET /page?ticket=ST-1 ──▶ force_https → handle ──────────────────▶ /p3/serviceValidate
//!                                         ◀── 302 /page + Set-Cookie (remove_ticket)
//!   GET /page (cookie) ─────▶ … → set_headers → whoami (X-CAS-User, X-CAS-Attr-*)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use axum_cas::config::{load_config, AppConfig};
use axum_cas::observability::logging;
use axum_cas::HttpServer;

#[derive(Parser)]
#[command(name = "axum-cas")]
#[command(about = "Serve a CAS-protected identity echo endpoint", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);

    tracing::info!("axum-cas v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        cas_server = %config.cas.server_url,
        protocol = ?config.cas.protocol,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let server = HttpServer::new(config)?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
