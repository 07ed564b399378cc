//! Error types

use std::time::Duration;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the hub server and client
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Binding or accepting on the listener failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket handshake with the server failed
    #[error("handshake failed: {0}")]
    Handshake(#[source] Box<tokio_tungstenite::tungstenite::Error>),

    /// Reading a frame from a peer failed
    #[error("read failed: {0}")]
    Read(String),

    /// Writing a frame to a peer failed
    #[error("write failed: {0}")]
    Write(#[source] axum::Error),

    /// Writing a frame to a peer did not finish in time
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// The transport was already closed
    #[error("connection closed")]
    Closed,
}

impl Error {
    /// Whether this error only concerns a single peer
    ///
    /// Per-peer errors are logged and never escalated.
    pub fn is_peer_error(&self) -> bool {
        matches!(
            self,
            Error::Read(_) | Error::Write(_) | Error::WriteTimeout(_) | Error::Closed
        )
    }
}
