//! Hub server implementation
//!
//! - `listener`: HTTP routes, heartbeat loop and drain sequence
//! - `connection`: per-peer read loop and WebSocket write half
//! - `broadcast`: the broadcast dispatcher
//! - `shutdown`: lifecycle phase and connection teardown

pub mod broadcast;
pub mod config;
pub mod connection;
pub mod listener;
pub mod shutdown;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use config::ServerConfig;
pub use connection::Disconnect;
pub use listener::HubServer;
pub use shutdown::ServerPhase;
