//! Hub client implementation
//!
//! Connects to a hub server, reports every received payload and leaves
//! gracefully on shutdown.

pub mod config;
pub mod subscriber;

pub use config::ClientConfig;
pub use subscriber::{ClientEvent, ClientExit, HubClient};
