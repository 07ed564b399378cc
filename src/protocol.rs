//! Application-level conventions layered on the WebSocket transport

/// Path serving the WebSocket upgrade
pub const CONNECT_PATH: &str = "/connect";

/// Path of the administrative broadcast trigger
pub const BROADCAST_PATH: &str = "/broadcast";

/// Client to server: the peer is about to disconnect
pub const LEAVE_PAYLOAD: &str = "leave";

/// Server heartbeat payload
pub const HEARTBEAT_PAYLOAD: &str = "hello";

/// Default payload of the administrative trigger
pub const BROADCAST_PAYLOAD: &str = "Broadcast";

/// Default address for both server and client
pub const DEFAULT_ADDR: &str = "localhost:8080";

/// Whether a text frame is the graceful leave notification
pub fn is_leave(text: &str) -> bool {
    text == LEAVE_PAYLOAD
}
