//! # Event-Gateway API
//!
//! JSON-over-HTTP interface for the routing engine.
//!
//! ```text
//!  ┌──────────────────────────────┐   ┌──────────────────────────┐
//!  │ Public HTTP (0.0.0.0:50051)  │   │ Admin (127.0.0.1:8080)   │
//!  │  POST /v1/register           │   │  GET|PUT /admin/auth...  │
//!  │  GET  /v1/nodes/:data_id     │   │  GET /admin/stats        │
//!  │  GET  /v1/chains/:chain/node │   │  GET /metrics, /health   │
//!  └──────────────┬───────────────┘   └────────────┬─────────────┘
//!                 │  BodyLimit → Tracing → Timeout │
//!                 └───────────────┬────────────────┘
//!                                 ▼
//!                RoutingEngine / CatalogRouter (eg-01)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use eg_02_api_gateway::{ApiGatewayService, AppState, GatewayConfig};
//!
//! let state = AppState::new(engine, catalog_router, metrics);
//! let service = ApiGatewayService::new(GatewayConfig::default(), state)?;
//! service.run(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod handlers;
pub mod middleware;
pub mod service;

pub use domain::{ApiError, BackendKind, ConfigError, GatewayConfig, GatewayError};
pub use handlers::AppState;
pub use service::{ApiGatewayService, Listeners};
