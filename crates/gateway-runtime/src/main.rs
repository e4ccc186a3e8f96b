//! # Event-Gateway
//!
//! Routes clients to a live worker node serving a data id or chain.
//!
//! ```text
//! gateway [--config PATH] [--backend memory|consul] [--http-port N]
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use eg_02_api_gateway::{ApiGatewayService, BackendKind};
use gateway_runtime::{build_backends, build_state, load_config, telemetry_config, Overrides};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "gateway")]
#[command(about = "Registry-backed round-robin routing gateway")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "EG_CONFIG")]
    config: Option<PathBuf>,

    /// Store and catalog backend (memory or consul)
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Public HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let overrides = Overrides {
        backend: args.backend,
        http_port: args.http_port,
    };
    let config = load_config(args.config.as_deref(), &overrides)?;

    let telemetry = telemetry_config(&config);
    let metrics = eg_telemetry::init_telemetry(&telemetry)
        .context("failed to initialize telemetry")?;

    info!(
        service = %telemetry.service_name,
        version = env!("CARGO_PKG_VERSION"),
        http = %config.http_addr(),
        backend = ?config.backend.kind,
        "starting"
    );

    let backends = build_backends(&config)?;
    let state = build_state(&config, backends, metrics.clone())?;
    let service = ApiGatewayService::new(config, state)?;

    service
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "cannot listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            info!("Ctrl+C received, draining");
        })
        .await?;

    Ok(())
}
