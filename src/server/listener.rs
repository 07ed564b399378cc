//! Hub server listener
//!
//! Serves the WebSocket upgrade and the broadcast trigger over HTTP, and
//! runs the heartbeat/shutdown loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::protocol::{BROADCAST_PATH, CONNECT_PATH};
use crate::registry::Registry;
use crate::server::broadcast::{BroadcastReport, Broadcaster};
use crate::server::config::ServerConfig;
use crate::server::connection;
use crate::server::shutdown::{self, ServerPhase};

const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1);

/// Broadcast hub server
pub struct HubServer {
    config: ServerConfig,
    registry: Arc<Registry>,
    broadcaster: Broadcaster,
    phase: watch::Sender<ServerPhase>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

/// State shared with the HTTP handlers
#[derive(Clone)]
struct AppState {
    registry: Arc<Registry>,
    broadcaster: Broadcaster,
    broadcast_payload: Arc<str>,
    phase: watch::Receiver<ServerPhase>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl HubServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(Registry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry), config.write_timeout);
        let (phase, _) = watch::channel(ServerPhase::Running);

        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            registry,
            broadcaster,
            phase,
            connection_semaphore,
        }
    }

    /// Get a reference to the connection registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Get the broadcast dispatcher
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> ServerPhase {
        *self.phase.borrow()
    }

    /// Build the HTTP router
    ///
    /// Must be served with `into_make_service_with_connect_info::<SocketAddr>()`.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: Arc::clone(&self.registry),
            broadcaster: self.broadcaster.clone(),
            broadcast_payload: Arc::from(self.config.broadcast_payload.as_str()),
            phase: self.phase.subscribe(),
            connection_semaphore: self.connection_semaphore.clone(),
        };

        Router::new()
            .route(CONNECT_PATH, get(connect_handler))
            .route(
                BROADCAST_PATH,
                get(broadcast_handler).post(broadcast_body_handler),
            )
            .with_state(state)
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let listener = TcpListener::bind(self.config.bind_addr.as_str()).await?;
        tracing::info!(addr = %listener.local_addr()?, "Hub server listening");
        Ok(listener)
    }

    /// Run the server until `shutdown` resolves
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = self.bind().await?;
        self.serve_until(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// Heartbeats are broadcast every `heartbeat_interval` while running.
    /// Once `shutdown` resolves the server drains: it stops accepting
    /// connections and triggers, closes every connection, waits up to
    /// `drain_timeout` for the HTTP server to stop and returns.
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let router = self.router();
        let stop = shutdown::wait_for_drain(self.phase.subscribe());

        let mut http = tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(stop)
            .await
        });

        self.heartbeat_until(shutdown).await;

        self.phase.send_replace(ServerPhase::Draining);
        shutdown::close_all(&self.registry, self.config.write_timeout).await;

        match tokio::time::timeout(self.config.drain_timeout, &mut http).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::error!(error = %e, "HTTP server failed"),
            Ok(Err(e)) => tracing::error!(error = %e, "HTTP server task failed"),
            Err(_) => {
                tracing::warn!("HTTP server did not stop in time, aborting");
                http.abort();
            }
        }

        self.phase.send_replace(ServerPhase::Stopped);
        tracing::info!("Hub server stopped");

        Ok(())
    }

    /// Broadcast heartbeats until `shutdown` resolves
    async fn heartbeat_until<F>(&self, shutdown: F)
    where
        F: std::future::Future<Output = ()>,
    {
        let period = self.config.heartbeat_interval.max(MIN_HEARTBEAT_INTERVAL);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // first tick is immediate

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received");
                    return;
                }
                _ = ticker.tick() => {
                    self.broadcaster.broadcast(&self.config.heartbeat_payload).await;
                }
            }
        }
    }
}

async fn connect_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    if !state.phase.borrow().is_running() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    // Check connection limit
    let permit = match state.connection_semaphore {
        Some(ref sem) => match Arc::clone(sem).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
        },
        None => None,
    };

    let registry = Arc::clone(&state.registry);
    let phase = state.phase.clone();
    ws.on_failed_upgrade(move |e| {
        tracing::warn!(peer = %peer_addr, error = %e, "WebSocket upgrade failed");
    })
    .on_upgrade(move |socket| async move {
        let _permit = permit;
        connection::handle_socket(socket, peer_addr, registry, phase).await;
    })
}

async fn broadcast_handler(State(state): State<AppState>) -> Response {
    let payload = Arc::clone(&state.broadcast_payload);
    run_broadcast(&state, &payload).await
}

async fn broadcast_body_handler(State(state): State<AppState>, body: Bytes) -> Response {
    if body.is_empty() {
        return broadcast_handler(State(state)).await;
    }

    match std::str::from_utf8(&body) {
        Ok(payload) => run_broadcast(&state, payload).await,
        Err(_) => (StatusCode::BAD_REQUEST, "payload must be UTF-8").into_response(),
    }
}

async fn run_broadcast(state: &AppState, payload: &str) -> Response {
    if !state.phase.borrow().is_running() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    tracing::info!(payload = payload, "Broadcast requested");
    let report: BroadcastReport = state.broadcaster.broadcast(payload).await;
    Json(report).into_response()
}
