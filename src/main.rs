//! Shared-secret gated reverse proxy.
//!
//! Every request must carry `accessToken` in its body and name its upstream
//! in the `target` query parameter. Authorized requests are replayed against
//! that upstream and the response is relayed back unchanged.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ proxy::auth ──▶ proxy::target ──▶ proxy::forward ──▶ Upstream
//!                     (wildcard)       (accessToken)   (?target=)        (Host rewrite,
//!                                                                         deadline)
//!     Client Response
//!     ◀────────────── http::response ◀──────────────────────────────────────────────────── Upstream
//!                     (relay, or {"error": ...})
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use gated_proxy::config::load_config;
use gated_proxy::lifecycle::signals::spawn_signal_listener;
use gated_proxy::observability::{logging, metrics};
use gated_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "gated-proxy", version)]
#[command(about = "Reverse proxy that forwards to ?target= after checking a shared secret", long_about = None)]
struct Cli {
    /// TOML configuration file (optional; environment variables override it)
    #[arg(short, long, env = "GATED_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides PORT and the config file)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    logging::init(&config.observability);

    tracing::info!("gated-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        missing_target = ?config.routing.missing_target,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        cors = config.cors.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation already rejected unparsable addresses.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(&shutdown);

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
