//! Gateway service: public HTTP server plus the localhost admin server.
//!
//! Both servers drain in-flight requests before [`ApiGatewayService::run`]
//! returns, whether the caller's shutdown future resolves or
//! [`ApiGatewayService::shutdown`] is called.

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    http::Uri,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use eg_telemetry::HttpMetrics;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

use crate::domain::config::GatewayConfig;
use crate::domain::error::{ApiError, GatewayError};
use crate::handlers::{self, admin, routing, AppState};
use crate::middleware::{TimeoutLayer, TracingLayer};

/// Gateway service state
pub struct ApiGatewayService {
    config: GatewayConfig,
    state: AppState,
    shutdown_tx: watch::Sender<bool>,
}

/// Listeners bound by [`ApiGatewayService::bind`], not yet serving.
pub struct Listeners {
    http: TcpListener,
    admin: Option<TcpListener>,
}

impl Listeners {
    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http.local_addr()
    }

    pub fn admin_addr(&self) -> std::io::Result<Option<SocketAddr>> {
        self.admin.as_ref().map(TcpListener::local_addr).transpose()
    }
}

impl ApiGatewayService {
    /// Create a new gateway service
    pub fn new(config: GatewayConfig, state: AppState) -> Result<Self, GatewayError> {
        config.validate()?;
        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            config,
            state,
            shutdown_tx,
        })
    }

    /// HTTP request metrics
    pub fn metrics(&self) -> &HttpMetrics {
        &self.state.telemetry.http
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind, then serve until `signal` resolves, [`shutdown`](Self::shutdown)
    /// is called, or the public server fails.
    pub async fn run<F>(&self, signal: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send,
    {
        let listeners = self.bind().await?;
        self.serve(listeners, signal).await
    }

    /// Bind the public listener and, when enabled, the admin listener.
    pub async fn bind(&self) -> Result<Listeners, GatewayError> {
        let http = bind(self.config.http_addr()).await?;
        let admin = if self.config.admin.enabled {
            Some(bind(self.config.admin_addr()).await?)
        } else {
            None
        };
        Ok(Listeners { http, admin })
    }

    /// Serve on already bound listeners. Returns once both servers have
    /// finished their in-flight requests.
    pub async fn serve<F>(&self, listeners: Listeners, signal: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send,
    {
        info!("Starting gateway...");

        if let Ok(addr) = listeners.http_addr() {
            info!(addr = %addr, "Starting HTTP server");
        }
        let mut http_handle = self.spawn_server(listeners.http, self.build_http_router());
        let admin_handle = listeners.admin.map(|listener| {
            if let Ok(addr) = listener.local_addr() {
                info!(addr = %addr, "Starting Admin server");
            }
            self.spawn_server(listener, self.build_admin_router())
        });

        info!("Gateway started successfully");

        let early_exit = tokio::select! {
            _ = signal => {
                info!("Received shutdown signal");
                None
            }
            joined = &mut http_handle => Some(joined),
        };

        self.shutdown();
        let joined = match early_exit {
            Some(joined) => joined,
            None => http_handle.await,
        };
        let result = server_result("HTTP", joined);

        if let Some(handle) = admin_handle {
            if let Err(e) = server_result("Admin", handle.await) {
                error!(error = %e, "Admin server stopped with an error");
            }
        }

        info!("Gateway stopped");
        result
    }

    /// Ask both servers to stop accepting connections and drain.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    fn spawn_server(
        &self,
        listener: TcpListener,
        router: Router,
    ) -> JoinHandle<std::io::Result<()>> {
        let stop = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(stopped(stop))
                .await
        })
    }

    /// Build the public router
    pub fn build_http_router(&self) -> Router {
        Router::new()
            .route("/v1/register", post(routing::register_node))
            .route("/v1/nodes/:data_id", get(routing::resolve_node))
            .route("/v1/chains/:chain/node", get(routing::resolve_chain_node))
            .route("/health", get(handlers::health_check))
            .route("/metrics", get(handlers::metrics))
            .fallback(route_not_found)
            .layer(RequestBodyLimitLayer::new(self.config.http.max_body_size))
            .layer(
                TimeoutLayer::new(self.config.http.request_timeout)
                    .with_metrics(self.metrics().clone()),
            )
            .layer(TracingLayer::with_metrics(self.metrics().clone()))
            .with_state(self.state.clone())
    }

    /// Build the admin router
    pub fn build_admin_router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health_check))
            .route("/metrics", get(handlers::metrics))
            .route(
                "/admin/authorization",
                get(admin::get_authorization).put(admin::put_authorization),
            )
            .route("/admin/stats", get(admin::stats))
            .fallback(route_not_found)
            .layer(RequestBodyLimitLayer::new(self.config.http.max_body_size))
            .layer(TracingLayer::new())
            .with_state(self.state.clone())
    }
}

async fn route_not_found(uri: Uri) -> impl IntoResponse {
    ApiError::route_not_found(uri.path())
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, GatewayError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| GatewayError::Bind {
            addr,
            reason: e.to_string(),
        })
}

/// Resolves once the stop flag is set or its sender is gone.
async fn stopped(mut stop: watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            return;
        }
    }
}

fn server_result(
    name: &str,
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), GatewayError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!(error = %e, "{name} server error");
            Err(GatewayError::Io(e))
        }
        Err(e) => {
            error!(error = %e, "{name} server task failed");
            Err(GatewayError::Io(std::io::Error::other(e.to_string())))
        }
    }
}
