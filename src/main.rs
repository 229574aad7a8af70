//! Templated route-rewriting reverse proxy.
//!
//! Forwards each request to the upstream of its matched route, asserting the
//! caller's identity through `X-Grafana-*` headers and filling route header,
//! query and body templates from route data and the caller.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────▶ http server ──▶ access control ──▶ routing ──▶ director ──▶ forward ──▶ Upstream
//!                                 (caller)        (route)    rewrite               │
//!                                                            compose               │
//!                                                            sanitize              │
//!     Client Response                                                              │
//!     ◀──────────────────────────────────────────────────────────────────────────────┘
//!
//!     Cross-cutting: config + watcher, observability, lifecycle
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use route_proxy::config::{load_config, ConfigWatcher, ProxyConfig};
use route_proxy::http::HttpServer;
use route_proxy::lifecycle::Shutdown;
use route_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "route-proxy")]
#[command(about = "Reverse proxy with identity headers and templated routes", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file; reloaded on change.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    if cli.check {
        println!("configuration OK: {} route(s)", config.routes.len());
        return Ok(());
    }

    logging::init(&config.observability.log_level);
    tracing::info!("route-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
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

    // The watcher handle must outlive the server for reloads to keep flowing.
    let (config_updates, _watcher) = match &cli.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (rx, Some(watcher.run()?))
        }
        None => {
            let (_, rx) = mpsc::unbounded_channel();
            (rx, None)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
