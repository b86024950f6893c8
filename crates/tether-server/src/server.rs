//! `TetherServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::Mutex;
use tether_core::ConnectionId;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::dispatcher::{Dispatcher, Inbound, RelayStats};
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::metrics::WS_CONNECTIONS_REJECTED_TOTAL;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::registry::ConnectionRegistry;
use crate::websocket::session::{SessionContext, run_ws_session};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Channel to the dispatcher.
    pub inbound: mpsc::Sender<Inbound>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Relay sizes published by the dispatcher.
    pub stats: Arc<RelayStats>,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The tether relay server.
pub struct TetherServer {
    config: Arc<ServerConfig>,
    registry: Arc<ConnectionRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    stats: Arc<RelayStats>,
    metrics: Option<PrometheusHandle>,
    inbound_tx: mpsc::Sender<Inbound>,
    inbound_rx: Mutex<Option<mpsc::Receiver<Inbound>>>,
}

impl TetherServer {
    /// Create a new server.
    pub fn new(config: ServerConfig) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_queue_capacity.max(1));
        Self {
            config: Arc::new(config),
            registry: Arc::new(ConnectionRegistry::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            stats: Arc::new(RelayStats::default()),
            metrics: None,
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
        }
    }

    /// Serve `/metrics` from this Prometheus handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: Arc::clone(&self.registry),
            inbound: self.inbound_tx.clone(),
            config: Arc::clone(&self.config),
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
            stats: Arc::clone(&self.stats),
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
            .layer(cors_layer(&self.config.allowed_origins))
            .layer(TraceLayer::new_for_http())
    }

    /// Bind, spawn the dispatcher and start serving.
    ///
    /// Returns the bound address and a handle that completes once the
    /// server and dispatcher have stopped. Can only be called once.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let Some(inbound_rx) = self.inbound_rx.lock().take() else {
            return Err(ServerError::AlreadyListening);
        };

        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local = listener.local_addr()?;

        let token = self.shutdown.token();
        let dispatcher = Dispatcher::new(
            Arc::clone(&self.registry),
            inbound_rx,
            Arc::clone(&self.stats),
        );
        let dispatcher = tokio::spawn(dispatcher.run(token.clone()));

        let app = self.router();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(e) = serve.await {
                warn!(error = %e, "server error");
            }
            let _ = dispatcher.await;
            info!("server stopped");
        });

        info!(addr = %local, "tether server listening");
        Ok((local, handle))
    }

    /// Live connections.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Relay sizes published by the dispatcher.
    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([axum::http::Method::GET])
}

/// GET /ws
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let connections = state.registry.count();
    if connections >= state.config.max_connections {
        counter!(WS_CONNECTIONS_REJECTED_TOTAL).increment(1);
        warn!(
            connections,
            max = state.config.max_connections,
            "connection limit reached, rejecting upgrade"
        );
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let ctx = SessionContext {
        registry: state.registry,
        inbound: state.inbound,
        send_queue_capacity: state.config.send_queue_capacity,
        heartbeat_interval: state.config.heartbeat_interval(),
        heartbeat_timeout: state.config.heartbeat_timeout(),
        cancel: state.shutdown.session_token(),
    };
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| run_ws_session(socket, ConnectionId::new(), ctx))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.registry.count(),
        state.stats.rooms(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => crate::metrics::render(&handle).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
