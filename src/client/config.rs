//! Client configuration

use std::time::Duration;

use crate::protocol::{CONNECT_PATH, DEFAULT_ADDR};

/// Client configuration options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address (`host:port`)
    pub addr: String,

    /// Upgrade path on the server
    pub path: String,

    /// How long to wait for the read loop after requesting leave
    pub leave_timeout: Duration,

    /// Capacity of the event channel handed to the caller
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            path: CONNECT_PATH.to_string(),
            leave_timeout: Duration::from_secs(2),
            event_capacity: 256,
        }
    }
}

impl ClientConfig {
    /// Create a config targeting `addr`
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Set the upgrade path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the leave timeout
    pub fn leave_timeout(mut self, timeout: Duration) -> Self {
        self.leave_timeout = timeout;
        self
    }

    /// Set the event channel capacity (at least 1)
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// WebSocket URL of the server
    pub fn url(&self) -> String {
        format!("ws://{}{}", self.addr, self.path)
    }
}
