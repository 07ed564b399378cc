//! Minimal WebSocket broadcast hub
//!
//! The server accepts WebSocket peers on `/connect`, keeps them in a
//! [`Registry`], and pushes a heartbeat to every member on a fixed interval.
//! `/broadcast` triggers an immediate broadcast cycle. The client connects,
//! logs what it receives and sends `"leave"` before exiting on a signal.
//!
//! # Example
//! ```no_run
//! use ws_hub::{HubServer, ServerConfig};
//!
//! # async fn example() -> ws_hub::error::Result<()> {
//! let server = HubServer::new(ServerConfig::default());
//! server.run_until(ws_hub::shutdown::shutdown_signal()).await
//! # }
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod telemetry;

pub use client::{ClientConfig, HubClient};
pub use registry::Registry;
pub use server::{HubServer, ServerConfig};
