//! # matchfeed
//!
//! Server binary: loads settings, installs logging and metrics, serves the
//! broadcast hub until Ctrl-C, then shuts down gracefully.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use matchfeed_server::config::ServerConfig;
use matchfeed_server::metrics;
use matchfeed_server::server::MatchfeedServer;
use matchfeed_settings::MatchfeedSettings;

/// Live match update broadcast server.
#[derive(Parser, Debug)]
#[command(name = "matchfeed", about = "Live match update broadcast server")]
struct Cli {
    /// Settings file (defaults to `~/.matchfeed/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Heartbeat period in milliseconds (overrides settings).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    heartbeat_interval_ms: Option<u64>,
}

impl Cli {
    fn load_settings(&self) -> Result<MatchfeedSettings> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(matchfeed_settings::settings_path);
        let mut settings = matchfeed_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        self.apply(&mut settings);
        Ok(settings)
    }

    fn apply(&self, settings: &mut MatchfeedSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ms) = self.heartbeat_interval_ms {
            settings.hub.heartbeat_interval_ms = ms;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.load_settings()?;

    matchfeed_core::logging::init_subscriber(&settings.logging.level, settings.logging.json);

    let mut server = MatchfeedServer::new(ServerConfig::from(&settings));
    match metrics::install_recorder() {
        Ok(handle) => server = server.with_metrics(handle),
        Err(e) => tracing::warn!(error = %e, "metrics recorder unavailable, /metrics disabled"),
    }

    let addr = server
        .listen()
        .await
        .context("Failed to start server")?;
    tracing::info!(%addr, "matchfeed ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("shutdown signal received");
    server.shutdown().await;
    Ok(())
}
