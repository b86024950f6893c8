//! # tether
//!
//! Tether relay server binary: loads settings, initializes logging and
//! metrics, and runs the WebSocket server until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tether_core::logging::{self, LogFormat};
use tether_server::config::ServerConfig;
use tether_server::server::TetherServer;
use tether_settings::TetherSettings;

/// Tether location relay server.
#[derive(Parser, Debug)]
#[command(name = "tether", about = "Real-time location relay server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Maximum concurrent connections (overrides settings).
    #[arg(long)]
    max_connections: Option<usize>,

    /// Log level or filter directive (overrides settings).
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Settings file (default `~/.tether/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    /// Apply command-line flags over loaded settings.
    fn apply(&self, settings: &mut TetherSettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(max) = self.max_connections {
            settings.server.max_connections = max;
        }
        if let Some(ref level) = self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.json_logs {
            settings.logging.format = LogFormat::Json;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(tether_settings::settings_path);
    let mut settings = tether_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    cli.apply(&mut settings);
    settings.validate().context("Invalid settings")?;

    logging::init_subscriber(&settings.logging.level, settings.logging.format);
    let metrics_handle = tether_server::metrics::install_recorder();

    let config = ServerConfig::from_settings(&settings.server);
    let server = TetherServer::new(config).with_metrics(metrics_handle);
    let (addr, handle) = server
        .listen()
        .await
        .context("Failed to start server")?;

    tracing::info!(
        %addr,
        settings = %settings_path.display(),
        max_connections = settings.server.max_connections,
        "tether relay ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("shutting down");
    server.shutdown().graceful_shutdown(vec![handle], None).await;

    Ok(())
}
