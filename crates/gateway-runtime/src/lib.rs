//! # Gateway Runtime Library
//!
//! Wiring for the `gateway` binary, exposed for testing.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, file, environment, CLI)
//! 2. Install logging and metrics
//! 3. Build the store and catalog backends
//! 4. Build the routing engine and chain router over one authorization set
//! 5. Serve

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use eg_01_routing_engine::adapters::{
    ConsulClient, ConsulConfig, ConsulKeyValueStore, ConsulServiceCatalog,
};
use eg_01_routing_engine::{
    AuthorizationGuard, CatalogRouter, InMemoryKeyValueStore, InMemoryServiceCatalog,
    KeyValueStore, RoutingEngine, ServiceCatalog,
};
use eg_02_api_gateway::{AppState, BackendKind, GatewayConfig};
use eg_telemetry::{RoutingMetrics, TelemetryConfig};
use tracing::info;

/// Command-line overrides, applied after file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend: Option<BackendKind>,
    pub http_port: Option<u16>,
}

/// Defaults, then the TOML file (if any), then `EG_*` variables, then
/// command-line overrides. The result is validated.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<GatewayConfig> {
    let mut config = match path {
        Some(path) => GatewayConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => GatewayConfig::default(),
    };
    config
        .apply_env()
        .context("invalid environment override")?;
    if let Some(kind) = overrides.backend {
        config.backend.kind = kind;
    }
    if let Some(port) = overrides.http_port {
        config.http.port = port;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Telemetry settings from the config file, overridden by the environment.
pub fn telemetry_config(config: &GatewayConfig) -> TelemetryConfig {
    TelemetryConfig::default()
        .with_log_level(config.telemetry.log_level.as_str())
        .with_json_logs(config.telemetry.json_logs)
        .apply_env()
}

/// Store and catalog the engine talks to.
#[derive(Clone)]
pub struct Backends {
    pub kv: Arc<dyn KeyValueStore>,
    pub catalog: Arc<dyn ServiceCatalog>,
}

pub fn build_backends(config: &GatewayConfig) -> Result<Backends> {
    match config.backend.kind {
        BackendKind::Memory => {
            let catalog = InMemoryServiceCatalog::new();
            for instance in &config.backend.memory.instances {
                catalog.register(config.routing.service_name.as_str(), instance.to_instance());
            }
            info!(
                instances = config.backend.memory.instances.len(),
                "using in-memory backend"
            );
            Ok(Backends {
                kv: Arc::new(InMemoryKeyValueStore::new()),
                catalog: Arc::new(catalog),
            })
        }
        BackendKind::Consul => {
            let consul = &config.backend.consul;
            let client = ConsulClient::new(&ConsulConfig {
                address: consul.address.clone(),
                token: consul.token.clone(),
                timeout: consul.timeout,
            })
            .context("failed to create consul client")?;
            info!(address = %consul.address, "using consul backend");
            Ok(Backends {
                kv: Arc::new(ConsulKeyValueStore::new(client.clone())),
                catalog: Arc::new(ConsulServiceCatalog::new(client)),
            })
        }
    }
}

/// Engine and chain router sharing one authorization set.
pub fn build_state(
    config: &GatewayConfig,
    backends: Backends,
    telemetry: RoutingMetrics,
) -> Result<AppState> {
    let routing = config.routing_config();
    let guard = Arc::new(AuthorizationGuard::new(config.authorized_nodes()?));
    telemetry.authorized_nodes.set(guard.len() as i64);

    let engine = Arc::new(RoutingEngine::new(
        routing.clone(),
        Arc::clone(&guard),
        backends.kv,
        Arc::clone(&backends.catalog),
    ));
    let catalog_router = Arc::new(CatalogRouter::new(routing, guard, backends.catalog));
    Ok(AppState::new(engine, catalog_router, telemetry))
}
