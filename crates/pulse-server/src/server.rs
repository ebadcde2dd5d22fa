//! `PulseServer` — Axum HTTP + WebSocket server and task wiring.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use pulse_gateway::{DocumentParser, HandlerRegistry};
use pulse_pubsub::{EventPublisher, PubSubBackend};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::observer::run_subscription_logger;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::bridge::EventBridge;
use crate::websocket::keepalive::run_keepalive;
use crate::websocket::registry::ConnectionRegistry;
use crate::websocket::session::run_ws_session;

/// Fatal server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),

    /// The HTTP server failed while serving.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection registry (fan-out entry point).
    pub registry: Arc<ConnectionRegistry>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus render handle, when the recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// Connection limit enforced at upgrade time.
    pub max_connections: usize,
}

/// The subscription server: router, registry, and background tasks.
///
/// Construction wires everything by reference — the registry is built
/// first, then handed to the bridge, the keep-alive timer, and the
/// observer. No global state.
pub struct PulseServer {
    config: ServerConfig,
    backend: Arc<dyn PubSubBackend>,
    registry: Arc<ConnectionRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl PulseServer {
    /// Create a server over the gateway seams and pub/sub backend.
    pub fn new(
        config: ServerConfig,
        parser: Arc<dyn DocumentParser>,
        handlers: HandlerRegistry,
        backend: Arc<dyn PubSubBackend>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(parser, Arc::new(handlers)));
        Self {
            config,
            backend,
            registry,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Install the global Prometheus recorder and expose `/metrics`.
    #[must_use]
    pub fn with_metrics_recorder(mut self) -> Self {
        self.metrics = Some(crate::metrics::install_recorder());
        self
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// A publisher bound to this server's channel, for embedding
    /// applications that emit events in-process.
    pub fn publisher(&self) -> EventPublisher {
        EventPublisher::new(self.backend.clone(), self.config.channel.clone())
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: self.registry.clone(),
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
            max_connections: self.config.max_connections,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws", get(ws_handler))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Spawn the bridge, keep-alive timer, and diagnostics observer.
    ///
    /// Timer tasks whose configured interval is zero are not spawned.
    pub fn spawn_core_tasks(&self) -> Vec<JoinHandle<()>> {
        let token = self.shutdown.token();
        let mut handles = vec![tokio::spawn(
            EventBridge::new(
                self.backend.clone(),
                self.config.channel.clone(),
                self.registry.clone(),
                token.clone(),
            )
            .run(),
        )];

        if self.config.keep_alive_interval_secs > 0 {
            handles.push(tokio::spawn(run_keepalive(
                self.backend.clone(),
                self.config.channel.clone(),
                Duration::from_secs(self.config.keep_alive_interval_secs),
                token.clone(),
            )));
        }

        if self.config.subscription_log_interval_secs > 0 {
            handles.push(tokio::spawn(run_subscription_logger(
                self.registry.clone(),
                Duration::from_secs(self.config.subscription_log_interval_secs),
                token,
            )));
        }

        handles
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(ServerError::Bind)?;
        let addr = listener.local_addr().map_err(ServerError::Bind)?;
        info!(%addr, "subscription server listening");
        self.serve(listener).await
    }

    /// Serve on an already-bound listener until shutdown.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let handles = self.spawn_core_tasks();

        let shutdown = self.shutdown.clone();
        drop(tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                shutdown.shutdown();
            }
        }));

        let token = self.shutdown.token();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(token.cancelled_owned())
            .await
            .map_err(ServerError::Serve)?;

        self.shutdown.drain(handles, None).await;
        Ok(())
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.registry.connection_count();
    let subscriptions = state.registry.subscription_count().await;
    Json(health::health_check(state.start_time, connections, subscriptions))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => crate::metrics::render(&handle).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// GET /ws — WebSocket upgrade.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    if state.registry.connection_count() >= state.max_connections {
        warn!(
            max = state.max_connections,
            "connection limit reached, rejecting upgrade"
        );
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let connection_id = format!("conn_{}", Uuid::now_v7());
    ws.on_upgrade(move |socket| run_ws_session(socket, connection_id, state.registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use pulse_gateway::{Document, GatewayError, ValidationError};
    use pulse_pubsub::MemoryBackend;
    use tower::ServiceExt;

    struct TestParser;

    impl DocumentParser for TestParser {
        fn parse(&self, text: &str) -> Result<Document, GatewayError> {
            Ok(Document::new(text, vec!["X".into()]))
        }

        fn validate(&self, _document: &Document) -> Vec<ValidationError> {
            vec![]
        }
    }

    fn make_server() -> PulseServer {
        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        PulseServer::new(
            config,
            Arc::new(TestParser),
            HandlerRegistry::new(),
            Arc::new(MemoryBackend::new()),
        )
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = make_server().router();

        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 0);
        assert_eq!(parsed["subscriptions"], 0);
        assert!(parsed["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn metrics_endpoint_404_without_recorder() {
        let app = make_server().router();

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ws_route_rejects_plain_get() {
        let app = make_server().router();

        let resp = app
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        // Not a valid upgrade request.
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = make_server().router();

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/nowhere")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn accessors() {
        let server = make_server();
        assert_eq!(server.config().channel, "graphql.subscription");
        assert_eq!(server.registry().connection_count(), 0);
        assert!(!server.shutdown().is_shutting_down());
        assert_eq!(server.publisher().channel(), "graphql.subscription");
    }

    #[tokio::test]
    async fn core_tasks_spawn_and_drain() {
        let server = make_server();
        let handles = server.spawn_core_tasks();
        // Bridge only: keep-alive and observer are disabled by default.
        assert_eq!(handles.len(), 1);
        server.shutdown().drain(handles, None).await;
    }

    #[tokio::test]
    async fn keep_alive_task_spawned_when_configured() {
        let config = ServerConfig {
            port: 0,
            keep_alive_interval_secs: 30,
            subscription_log_interval_secs: 10,
            ..ServerConfig::default()
        };
        let server = PulseServer::new(
            config,
            Arc::new(TestParser),
            HandlerRegistry::new(),
            Arc::new(MemoryBackend::new()),
        );
        let handles = server.spawn_core_tasks();
        assert_eq!(handles.len(), 3);
        server.shutdown().drain(handles, None).await;
    }
}
