//! Per-connection handling
//!
//! Each upgraded WebSocket is split in two. The write half goes into the
//! registry (wrapped in [`WebSocketSink`]) so broadcasts can reach it; the
//! read half stays with the connection task, which reads until the peer
//! leaves, closes or fails, then unregisters.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::{watch, Mutex};

use crate::error::{Error, Result};
use crate::protocol;
use crate::registry::{Connection, ConnectionId, PeerSink, Registry};
use crate::server::shutdown::ServerPhase;

/// Why a connection's read loop ended
#[derive(Debug)]
pub enum Disconnect {
    /// Peer sent the `"leave"` notification
    Leave,
    /// Peer sent a close frame
    Closed,
    /// Stream ended without a close frame
    Eof,
    /// Reading a frame failed
    ReadFailure(Error),
    /// The connection could not be registered, or arrived after draining
    /// started
    Rejected,
}

impl Disconnect {
    /// Whether the peer disconnected on purpose
    pub fn is_graceful(&self) -> bool {
        matches!(self, Disconnect::Leave | Disconnect::Closed)
    }
}

/// Write half of an axum WebSocket
pub struct WebSocketSink {
    inner: Mutex<SplitSink<WebSocket, Message>>,
}

impl WebSocketSink {
    /// Wrap the write half of a split socket
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            inner: Mutex::new(sink),
        }
    }
}

#[async_trait]
impl PeerSink for WebSocketSink {
    async fn send_text(&self, payload: &str) -> Result<()> {
        self.inner
            .lock()
            .await
            .send(Message::Text(payload.to_owned().into()))
            .await
            .map_err(Error::Write)
    }

    async fn close(&self) -> Result<()> {
        self.inner.lock().await.close().await.map_err(Error::Write)
    }
}

/// Serve an upgraded socket until the peer goes away
pub async fn handle_socket(
    socket: WebSocket,
    peer_addr: SocketAddr,
    registry: Arc<Registry>,
    phase: watch::Receiver<ServerPhase>,
) -> Disconnect {
    let (sink, stream) = socket.split();
    let connection = Arc::new(Connection::new(
        registry.next_id(),
        peer_addr,
        WebSocketSink::new(sink),
    ));

    serve_connection(&registry, connection, stream, &phase).await
}

/// Register `connection`, read `inbound` until disconnect, then unregister
///
/// The connection is removed from the registry exactly once, also when the
/// returned future is dropped before completion. A connection that is
/// registered once `phase` has left `Running` is closed straight away, since
/// the drain may already have taken its snapshot.
pub async fn serve_connection<S>(
    registry: &Arc<Registry>,
    connection: Arc<Connection>,
    inbound: S,
    phase: &watch::Receiver<ServerPhase>,
) -> Disconnect
where
    S: Stream<Item = std::result::Result<Message, axum::Error>> + Unpin,
{
    let id = connection.id();
    let peer = connection.peer_addr();

    let Some(registration) = registry.register(Arc::clone(&connection)) else {
        let _ = connection.close().await;
        return Disconnect::Rejected;
    };

    // Checked after registering: the drain flips the phase before it
    // snapshots the registry, so one of the two always sees this connection.
    let draining = !phase.borrow().is_running();
    if draining {
        tracing::info!(conn = %id, peer = %peer, "Connection arrived while draining");
        drop(registration);
        let _ = connection.close().await;
        return Disconnect::Rejected;
    }

    let reason = read_until_disconnect(id, inbound).await;
    match &reason {
        Disconnect::Leave => tracing::info!(conn = %id, peer = %peer, "Peer left"),
        Disconnect::Closed => tracing::info!(conn = %id, peer = %peer, "Peer closed connection"),
        Disconnect::Eof => tracing::warn!(conn = %id, peer = %peer, "Peer stream ended"),
        Disconnect::ReadFailure(e) => {
            tracing::warn!(conn = %id, peer = %peer, error = %e, "Failed to read from peer")
        }
        Disconnect::Rejected => {}
    }

    drop(registration);

    if let Err(e) = connection.close().await {
        tracing::debug!(conn = %id, error = %e, "Close after disconnect failed");
    }

    reason
}

async fn read_until_disconnect<S>(id: ConnectionId, mut inbound: S) -> Disconnect
where
    S: Stream<Item = std::result::Result<Message, axum::Error>> + Unpin,
{
    while let Some(frame) = inbound.next().await {
        match frame {
            Ok(Message::Text(text)) if protocol::is_leave(text.as_str()) => {
                return Disconnect::Leave;
            }
            Ok(Message::Text(text)) => {
                tracing::debug!(conn = %id, payload = text.as_str(), "Ignoring text frame");
            }
            Ok(Message::Close(_)) => return Disconnect::Closed,
            Ok(_) => {} // ping/pong handled by axum, binary ignored
            Err(e) => return Disconnect::ReadFailure(Error::Read(e.to_string())),
        }
    }

    Disconnect::Eof
}
