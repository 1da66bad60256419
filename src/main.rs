//! Watchman: HTTP reverse proxy with Basic authentication.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                     WATCHMAN                     │
//!                     │                                                  │
//!   Client Request    │  ┌─────────┐    ┌────────────┐    ┌──────────┐  │
//!   ──────────────────┼─▶│  http   │───▶│ basic auth │───▶│ director │──┼──▶ Upstream
//!                     │  │ server  │    │ middleware │    │ rewrite  │  │
//!                     │  └─────────┘    └─────┬──────┘    └──────────┘  │
//!   401 / Response    │                       │                         │
//!   ◀─────────────────┼───────────────────────┘  streamed response ◀────┼─── Upstream
//!                     │                                                  │
//!                     │  config: defaults → env → TOML file → validate   │
//!                     │  auth:   htpasswd store, reloaded on change      │
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use watchman_proxy::config::ConfigResolver;
use watchman_proxy::lifecycle::{signals, startup, Shutdown};
use watchman_proxy::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "watchman", version, about = "HTTP reverse proxy with Basic authentication")]
struct Cli {
    /// Config file path. Defaults to $WATCHMAN_CONFIG or watchman.conf,
    /// relative to $WATCHMAN_DIR.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init();

    tracing::info!("watchman v{} starting", env!("CARGO_PKG_VERSION"));

    let resolver = ConfigResolver::from_process_env();
    let config_path = resolver.config_path(cli.config.as_deref());
    let config = resolver.resolve(&config_path).inspect_err(|e| {
        tracing::error!(error = %e, "Configuration failed");
    })?;

    tracing::info!(
        listen_address = %config.listen_address(),
        destination_address = %config.destination_address(),
        passwd_file = %config.credential_file().display(),
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    startup::run(config, &shutdown).await.inspect_err(|e| {
        tracing::error!(error = %e, "Gateway failed");
    })?;

    tracing::info!("Shutdown complete");
    Ok(())
}
