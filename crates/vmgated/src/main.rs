//! vmgated — the VM operations gateway daemon.
//!
//! Single binary that assembles the gateway:
//! - vSphere client (session + hardware reconfiguration)
//! - Telemetry store (InfluxDB range queries)
//! - Provisioning trigger (Terraform init + apply)
//! - REST API
//!
//! # Usage
//!
//! ```text
//! vmgated --port 8000 --config /etc/vmgate/vmgate.toml
//! ```

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vmgate_api::ApiState;
use vmgate_provision::ProvisioningTrigger;
use vmgate_telemetry::TelemetryStore;
use vmgate_vsphere::VsphereClient;

use crate::config::GatewayConfig;

#[derive(Parser)]
#[command(name = "vmgated", about = "VM operations gateway daemon")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Optional TOML config file. Environment variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load .env before the subscriber so RUST_LOG from it applies.
    let dotenv = dotenvy::dotenv();
    init_tracing(cli.log_format);
    if let Err(e) = dotenv
        && !e.not_found()
    {
        warn!(error = %e, "failed to load .env file");
    }

    let config = GatewayConfig::load(cli.config.as_deref()).context("loading configuration")?;
    run(cli.port, config).await
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vmgated=debug,vmgate=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(port: u16, config: GatewayConfig) -> anyhow::Result<()> {
    info!("vmgate daemon starting");

    // ── Initialize subsystems ──────────────────────────────────

    let vsphere = VsphereClient::new(config.vsphere);
    info!(base_url = %vsphere.config().base_url, "vsphere client initialized");

    let telemetry = Arc::new(TelemetryStore::new(config.influx));
    info!(
        url = %telemetry.config().url,
        bucket = %telemetry.config().bucket,
        "telemetry store initialized"
    );

    let provisioner = Arc::new(ProvisioningTrigger::new(config.provision));
    info!(
        dir = %provisioner.config().working_dir.display(),
        binary = %provisioner.config().binary.display(),
        "provisioning trigger initialized"
    );

    // ── Start API server ───────────────────────────────────────

    let state = ApiState::new(vsphere, telemetry.clone(), provisioner);
    let router = vmgate_api::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    telemetry.shutdown();

    info!("vmgate daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => warn!(error = %e, "failed to listen for Ctrl-C; shutting down"),
    }
}
