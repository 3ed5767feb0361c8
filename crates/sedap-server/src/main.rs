//! # sedap-server
//!
//! Connects to a debug adapter, performs the start-up handshake, and serves
//! debugger panels over WebSocket until Ctrl-C or the session ends.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sedap_bridge::{EventPump, signal_channel};
use sedap_dap::{ClientOptions, DapClient};
use sedap_server::config::ServerConfig;
use sedap_server::notifier::TracingNotifier;
use sedap_server::server::SedapServer;
use sedap_server::shutdown::DEFAULT_DRAIN_TIMEOUT;
use sedap_settings::SedapSettings;
use tokio::net::TcpStream;

/// Debugger panel host.
#[derive(Parser, Debug)]
#[command(name = "sedap-server", about = "Pair debugger panels with a debug adapter session")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Debug adapter address as `host:port` (overrides settings).
    #[arg(long)]
    adapter: Option<String>,

    /// Print debuggee `log` events.
    #[arg(long)]
    log_debuggee: bool,

    /// Settings file (default `~/.sedap/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    /// Flags win over every settings layer.
    fn apply(&self, settings: &mut SedapSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(adapter) = &self.adapter {
            settings.adapter.address.clone_from(adapter);
        }
        if self.log_debuggee {
            settings.bridge.log_enabled = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(sedap_settings::settings_path);
    let mut settings = sedap_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    cli.apply(&mut settings);

    sedap_core::logging::init_subscriber(&settings.logging.level);

    let stream = TcpStream::connect(&settings.adapter.address)
        .await
        .with_context(|| format!("Failed to connect to adapter at {}", settings.adapter.address))?;
    let (read, write) = stream.into_split();
    let (signals, signal_rx) = signal_channel();
    let options = ClientOptions {
        request_timeout: settings.adapter.request_timeout_ms.map(Duration::from_millis),
        ..ClientOptions::default()
    };
    let (client, session) = DapClient::start_with_options(read, write, signals, options);

    let _capabilities = client
        .handshake(
            &settings.adapter.adapter_id,
            settings.adapter.request.command(),
            settings.adapter.arguments.clone(),
        )
        .await
        .context("Adapter handshake failed")?;

    let server = SedapServer::new(ServerConfig::from_settings(&settings), Arc::new(TracingNotifier));
    server.session().set(session);

    let slot = server.session().clone();
    let pump = EventPump::new(signal_rx, server.registry().clone()).on_terminated(move |ended| {
        let _ = slot.clear_if(ended);
    });
    let pump_handle = tokio::spawn(pump.run());

    let (addr, server_handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("sedap-server listening on ws://{addr}/ws");

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    let _ = server.shutdown().wait_for(interrupt, client.closed()).await;

    let disposed = server.registry().dispose_all();
    tracing::info!(disposed, "bridges released");
    client.close().await;
    server
        .shutdown()
        .drain(vec![server_handle, pump_handle], DEFAULT_DRAIN_TIMEOUT)
        .await;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_override_nothing() {
        let cli = Cli::parse_from(["sedap-server"]);
        let mut settings = SedapSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings, SedapSettings::default());
    }

    #[test]
    fn cli_flags_override_settings() {
        let cli = Cli::parse_from([
            "sedap-server",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--adapter",
            "10.0.0.2:4712",
            "--log-debuggee",
        ]);
        let mut settings = SedapSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.adapter.address, "10.0.0.2:4712");
        assert!(settings.bridge.log_enabled);
    }

    #[test]
    fn cli_settings_path() {
        let cli = Cli::parse_from(["sedap-server", "--settings", "/tmp/s.json"]);
        assert_eq!(cli.settings, Some(PathBuf::from("/tmp/s.json")));
    }
}
