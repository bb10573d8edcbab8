//! HTTP dispatch server.
//!
//! ```text
//!   Client ──▶ Axum (request id, trace) ──▶ App::dispatch
//!                                             │
//!              pre-event → CORS → HEAD/OPTIONS short circuit → resolve
//!              → params → middleware → handler → next → post-event
//!                                             │
//!   Client ◀── single response write ◀────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use http_dispatch::{demo, observability, App, HttpServer};

#[derive(Parser)]
#[command(name = "http-dispatch")]
#[command(about = "Serve the HTTP dispatch layer", long_about = None)]
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

    let mut app = match &cli.config {
        Some(path) => App::load(path)?,
        None => App::new(),
    };
    observability::logging::init(&app.config().observability);

    tracing::info!("http-dispatch v{} starting", env!("CARGO_PKG_VERSION"));

    demo::register(&mut app)?;

    let bind_address = cli
        .bind
        .unwrap_or_else(|| app.config().listener.bind_address.clone());

    tracing::info!(
        bind_address = %bind_address,
        params_mode = %app.config().params_mode,
        cors_configured = app.cors_policy().is_configured(),
        "Configuration loaded"
    );

    let observability_config = app.config().observability.clone();
    if observability_config.metrics_enabled {
        if let Ok(addr) = observability_config.metrics_address.parse() {
            observability::metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %observability_config.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&bind_address).await?;
    let server = HttpServer::new(Arc::new(app));
    server.run(listener, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
