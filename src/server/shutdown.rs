//! Server shutdown coordination
//!
//! The server moves through `Running → Draining → Stopped`. The current
//! phase is published on a `watch` channel so the HTTP layer can stop
//! accepting work as soon as draining starts.

use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;

use crate::registry::Registry;

/// Server lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPhase {
    /// Accepting connections and broadcasting
    Running,
    /// Shutdown requested, closing connections
    Draining,
    /// All work finished
    Stopped,
}

impl ServerPhase {
    /// Whether new connections and broadcast triggers are accepted
    pub fn is_running(&self) -> bool {
        *self == ServerPhase::Running
    }
}

/// Resolves once `phase` leaves [`ServerPhase::Running`]
///
/// Also resolves if the sending side is gone.
pub async fn wait_for_drain(mut phase: watch::Receiver<ServerPhase>) {
    let _ = phase.wait_for(|p| !p.is_running()).await;
}

/// Close every current member of the registry
///
/// The registry is snapshotted once. Closes run concurrently, each bounded
/// by `close_timeout`; failures are logged and otherwise ignored. Returns
/// the number of connections that closed cleanly.
pub async fn close_all(registry: &Registry, close_timeout: Duration) -> usize {
    let members = registry.snapshot();
    tracing::info!(connections = members.len(), "Closing connections");

    let closes = members.iter().map(|connection| async move {
        match tokio::time::timeout(close_timeout, connection.close()).await {
            Ok(Ok(())) => {
                tracing::debug!(
                    conn = %connection.id(),
                    peer = %connection.peer_addr(),
                    connected_secs = connection.age().as_secs(),
                    "Closed connection"
                );
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(conn = %connection.id(), error = %e, "Failed to close connection");
                false
            }
            Err(_) => {
                tracing::warn!(conn = %connection.id(), "Timed out closing connection");
                false
            }
        }
    });

    join_all(closes).await.into_iter().filter(|ok| *ok).count()
}
