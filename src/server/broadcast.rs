//! Broadcast dispatcher
//!
//! One broadcast cycle writes a single payload to every registered peer.
//! Delivery is best-effort: a failed or slow write is logged and counted,
//! and never stops delivery to the other peers.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::registry::{Connection, Registry};

/// Outcome of one broadcast cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BroadcastReport {
    /// Members present in the snapshot
    pub attempted: usize,
    /// Writes that completed
    pub delivered: usize,
    /// Writes that failed or timed out
    pub failed: usize,
}

/// Writes payloads to every member of a registry
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
    write_timeout: Duration,
}

impl Broadcaster {
    /// Create a dispatcher over the given registry
    pub fn new(registry: Arc<Registry>, write_timeout: Duration) -> Self {
        Self {
            registry,
            write_timeout,
        }
    }

    /// Run one broadcast cycle
    ///
    /// Returns once every write attempt has finished. Writes to different
    /// peers run concurrently. Failures never remove a peer from the
    /// registry; that is left to the peer's read loop.
    pub async fn broadcast(&self, payload: &str) -> BroadcastReport {
        let members = self.registry.snapshot();
        if members.is_empty() {
            tracing::trace!("Broadcast skipped, no members");
            return BroadcastReport::default();
        }

        let writes = members
            .iter()
            .map(|connection| self.write_one(connection, payload));
        let results = join_all(writes).await;

        let delivered = results.iter().filter(|ok| **ok).count();
        let report = BroadcastReport {
            attempted: members.len(),
            delivered,
            failed: members.len() - delivered,
        };

        tracing::debug!(
            payload = payload,
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            "Broadcast cycle finished"
        );

        report
    }

    async fn write_one(&self, connection: &Connection, payload: &str) -> bool {
        let result = match tokio::time::timeout(self.write_timeout, connection.send(payload)).await
        {
            Ok(result) => result,
            Err(_) => Err(Error::WriteTimeout(self.write_timeout)),
        };

        match result {
            Ok(()) => {
                tracing::trace!(conn = %connection.id(), "Wrote payload");
                true
            }
            Err(e) => {
                tracing::warn!(
                    conn = %connection.id(),
                    peer = %connection.peer_addr(),
                    error = %e,
                    "Failed to write payload"
                );
                false
            }
        }
    }
}
