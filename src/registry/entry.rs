//! Connection entry types
//!
//! This module defines the per-peer state stored in the registry.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::Result;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Write half of a peer's transport
///
/// Reading is owned by the connection handler; everything else that needs
/// to talk to the peer goes through this trait.
#[async_trait]
pub trait PeerSink: Send + Sync {
    /// Send one text frame
    async fn send_text(&self, payload: &str) -> Result<()>;

    /// Close the transport
    ///
    /// Closing an already closed transport should return [`crate::error::Error::Closed`]
    /// or succeed; it must not panic.
    async fn close(&self) -> Result<()>;
}

/// A registered peer
pub struct Connection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    connected_at: Instant,
    sink: Box<dyn PeerSink>,
}

impl Connection {
    /// Create a new connection around the write half of a transport
    pub fn new(id: ConnectionId, peer_addr: SocketAddr, sink: impl PeerSink + 'static) -> Self {
        Self {
            id,
            peer_addr,
            connected_at: Instant::now(),
            sink: Box::new(sink),
        }
    }

    /// Connection identity
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// How long this peer has been connected
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Send a text frame to the peer
    pub async fn send(&self, payload: &str) -> Result<()> {
        self.sink.send_text(payload).await
    }

    /// Close the peer's transport
    pub async fn close(&self) -> Result<()> {
        self.sink.close().await
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .finish_non_exhaustive()
    }
}
