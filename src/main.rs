//! # courier
//!
//! Courier server binary: loads settings, initializes logging and metrics,
//! wires the access gate, and serves the demo handlers over `WebSocket`.

#![deny(unsafe_code)]

mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use courier_auth::{JwtGate, StaticTokenGate};
use courier_rpc::{Authorization, Dispatcher};
use courier_server::{CourierServer, ServerConfig};
use courier_settings::{AuthMode, AuthSettings, CourierSettings};
use courier_telemetry::{TelemetryConfig, init_telemetry};

/// Courier `WebSocket` router.
#[derive(Parser, Debug)]
#[command(name = "courier", about = "JSON envelope router over WebSocket")]
struct Cli {
    /// Settings file (defaults to `~/.courier/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Emit JSON log lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// Load settings from the chosen file and fold the CLI flags over them.
    fn resolve_settings(&self) -> Result<CourierSettings> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(courier_settings::settings_path);
        let mut settings = courier_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;

        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if self.log_json {
            settings.logging.json = true;
        }
        courier_settings::loader::validate(&settings).context("Invalid settings")?;
        Ok(settings)
    }
}

/// Pick the dispatcher's authorization from the configured mode.
fn build_authorization(auth: &AuthSettings) -> Result<Authorization> {
    let authorization = match auth.mode {
        AuthMode::None => Authorization::Disabled,
        AuthMode::Static => {
            let gate = StaticTokenGate::new(auth.tokens.clone())
                .context("Invalid static token table")?;
            tracing::info!(tokens = gate.len(), "static token gate enabled");
            Authorization::Gate(Arc::new(gate))
        }
        AuthMode::Jwt => {
            let mut gate = JwtGate::new(&auth.jwt.secret, auth.jwt.issuer.as_deref())
                .context("Invalid JWT settings")?;
            if let Some(audience) = &auth.jwt.audience {
                gate = gate.with_audience(audience);
            }
            tracing::info!(issuer = ?auth.jwt.issuer, audience = ?auth.jwt.audience, "JWT gate enabled");
            Authorization::Gate(Arc::new(gate))
        }
    };
    Ok(authorization)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.resolve_settings()?;

    let telemetry = TelemetryConfig::from_settings(&settings.logging)?;
    init_telemetry(&telemetry)?;

    let metrics = courier_server::metrics::install_recorder()?;

    let dispatcher = Arc::new(Dispatcher::new(build_authorization(&settings.auth)?));
    let server =
        CourierServer::new(ServerConfig::from(&settings.server), dispatcher).with_metrics(metrics);
    handlers::register_demo_handlers(server.dispatcher(), Arc::clone(server.connections()))?;

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!(
        "Courier listening on ws://{addr}{} ({} handlers registered, auth: {})",
        settings.server.ws_path,
        server.dispatcher().registry().len(),
        settings.auth.mode,
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    let drained = server
        .shutdown()
        .graceful_shutdown(vec![handle], None)
        .await;
    if !drained {
        tracing::warn!("listener did not stop in time; exiting anyway");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
