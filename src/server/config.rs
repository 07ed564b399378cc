//! Server configuration

use std::time::Duration;

use crate::protocol::{BROADCAST_PAYLOAD, DEFAULT_ADDR, HEARTBEAT_PAYLOAD};

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (`host:port`)
    pub bind_addr: String,

    /// Interval between heartbeat broadcasts
    pub heartbeat_interval: Duration,

    /// Payload sent on every heartbeat
    pub heartbeat_payload: String,

    /// Payload sent by the administrative trigger when no body is given
    pub broadcast_payload: String,

    /// Upper bound on a single write to one peer
    pub write_timeout: Duration,

    /// How long the HTTP server may take to stop after draining
    pub drain_timeout: Duration,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            heartbeat_interval: Duration::from_secs(1),
            heartbeat_payload: HEARTBEAT_PAYLOAD.to_string(),
            broadcast_payload: BROADCAST_PAYLOAD.to_string(),
            write_timeout: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(5),
            max_connections: 0, // Unlimited
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: impl Into<String>) -> Self {
        Self {
            bind_addr: addr.into(),
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Set the heartbeat interval
    ///
    /// A zero interval is raised to one millisecond.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the heartbeat payload
    pub fn heartbeat_payload(mut self, payload: impl Into<String>) -> Self {
        self.heartbeat_payload = payload.into();
        self
    }

    /// Set the default administrative broadcast payload
    pub fn broadcast_payload(mut self, payload: impl Into<String>) -> Self {
        self.broadcast_payload = payload.into();
        self
    }

    /// Set the per-peer write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the drain timeout
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr, "localhost:8080");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(1));
        assert_eq!(config.heartbeat_payload, "hello");
        assert_eq!(config.broadcast_payload, "Broadcast");
        assert_eq!(config.max_connections, 0);
    }

    #[test]
    fn test_with_addr() {
        let config = ServerConfig::with_addr("127.0.0.1:9000");

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.heartbeat_payload, "hello");
    }

    #[test]
    fn test_builder_heartbeat_interval_floor() {
        let config = ServerConfig::default().heartbeat_interval(Duration::ZERO);

        assert_eq!(config.heartbeat_interval, Duration::from_millis(1));
    }

    #[test]
    fn test_builder_chaining() {
        let config = ServerConfig::default()
            .bind("0.0.0.0:8081")
            .heartbeat_interval(Duration::from_millis(250))
            .heartbeat_payload("ping")
            .broadcast_payload("news")
            .write_timeout(Duration::from_secs(2))
            .drain_timeout(Duration::from_secs(1))
            .max_connections(10);

        assert_eq!(config.bind_addr, "0.0.0.0:8081");
        assert_eq!(config.heartbeat_interval, Duration::from_millis(250));
        assert_eq!(config.heartbeat_payload, "ping");
        assert_eq!(config.broadcast_payload, "news");
        assert_eq!(config.write_timeout, Duration::from_secs(2));
        assert_eq!(config.drain_timeout, Duration::from_secs(1));
        assert_eq!(config.max_connections, 10);
    }
}
