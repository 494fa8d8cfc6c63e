//! `MiseServer` — axum HTTP + WebSocket server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::{Json, Response};
use axum::routing::get;
use mise_events::EventHub;

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::registry::ConnectionRegistry;
use crate::websocket::session::run_ws_session;

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The event hub.
    pub hub: Arc<EventHub>,
    /// Registry of open connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

/// The mise server.
pub struct MiseServer {
    state: AppState,
}

impl MiseServer {
    /// Create a new server over the given hub.
    #[must_use]
    pub fn new(config: ServerConfig, hub: Arc<EventHub>) -> Self {
        Self {
            state: AppState {
                hub,
                registry: Arc::new(ConnectionRegistry::new()),
                shutdown: Arc::new(ShutdownCoordinator::new()),
                start_time: Instant::now(),
                config: Arc::new(config),
            },
        }
    }

    /// Build the axum router with all routes.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/api", get(ws_handler))
            .with_state(self.state.clone())
    }

    /// Get the connection registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.state.registry
    }

    /// Get the shutdown coordinator.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Get the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.registry.count(),
    ))
}

/// GET /api: WebSocket upgrade.
async fn ws_handler(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    let client_id = format!("conn_{}", uuid::Uuid::new_v4());
    upgrade.on_upgrade(move |socket| {
        run_ws_session(
            socket,
            client_id,
            state.hub.clone(),
            state.registry.clone(),
            Duration::from_secs(state.config.heartbeat_interval_secs),
            Duration::from_secs(state.config.heartbeat_timeout_secs),
        )
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
