//! Switchyard demonstration server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ axum (trace, request id, timeout)
//!                         │
//!                         ▼
//!                     Router::handle
//!                         │  match (method, path) → 404 / 405
//!                         │  validate headers → body → path → query → cookies
//!                         ▼
//!                     middleware 1 … middleware N → handler
//!                         │  each returns an Envelope
//!                         ▼
//!     Client Response ◀── status code + wire body + queued headers
//! ```

mod demo;

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use switchyard::config::{load_config, ServerConfig};
use switchyard::lifecycle::{signals, Shutdown};
use switchyard::observability::{logging, metrics};
use switchyard::routing::Router;
use switchyard::HttpServer;

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Typed RPC router demonstration server", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the route manifest as JSON and exit.
    #[arg(long)]
    print_routes: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    let router = Router::new().mount(&config.api.base_path, demo::routes()?)?;

    if cli.print_routes {
        println!("{}", serde_json::to_string_pretty(&router.manifest())?);
        return Ok(());
    }

    logging::init_logging(&config.observability);
    tracing::info!("switchyard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_path = %config.api.base_path,
        routes = router.manifest().routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, router);
    let mut serving = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut serving => result??,
        _ = signals::shutdown_on_signal(&shutdown) => serving.await??,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
