//! `HeraldServer`: Axum HTTP and WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use herald_core::Event;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::errors::{Result, ServerError};
use crate::health::{HealthResponse, Uptime};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::broadcast::{Broadcaster, PublishReport};
use crate::websocket::endpoint::ws_handler;
use crate::websocket::registry::ConnectionRegistry;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Open channel connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Fan-out over `registry`.
    pub broadcaster: Arc<Broadcaster>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Start markers for `/health`.
    pub uptime: Uptime,
    /// Prometheus handle for `/metrics`.
    pub metrics: PrometheusHandle,
}

/// The notification server.
pub struct HeraldServer {
    state: AppState,
}

impl HeraldServer {
    /// Create a new server.
    pub fn new(config: ServerConfig, metrics: PrometheusHandle) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(registry.clone()));
        Self {
            state: AppState {
                registry,
                broadcaster,
                config: Arc::new(config),
                shutdown: Arc::new(ShutdownCoordinator::new()),
                uptime: Uptime::start(),
                metrics,
            },
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .route("/events", post(publish_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>)> {
        let addr = self.state.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        let router = self.router();
        let signal = self.state.shutdown.serve_signal();

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(signal)
                .await
            {
                error!(error = %e, "server terminated with error");
            }
        });
        info!(%local_addr, "notification server listening");
        Ok((local_addr, handle))
    }

    /// Fan-out handle for in-process event sources.
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.state.broadcaster
    }

    /// The connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.state.registry
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }
}

/// POST /events
async fn publish_handler(
    State(state): State<AppState>,
    Json(event): Json<Event>,
) -> (StatusCode, Json<PublishReport>) {
    let report = state.broadcaster.publish(&event);
    (StatusCode::ACCEPTED, Json(report))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(state.uptime.report(
        state.registry.len(),
        state.config.max_connections,
        state.shutdown.is_shutting_down(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}
