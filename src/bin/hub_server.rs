//! Broadcast hub server
//!
//! Run with: cargo run --bin hub-server -- [--addr HOST:PORT]
//!
//! Peers connect with a WebSocket client to `ws://HOST:PORT/connect` and get
//! a `hello` every heartbeat. Trigger an immediate broadcast with:
//!
//!   curl http://HOST:PORT/broadcast
//!   curl -d 'custom payload' http://HOST:PORT/broadcast

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ws_hub::protocol::DEFAULT_ADDR;
use ws_hub::shutdown::shutdown_signal;
use ws_hub::{HubServer, ServerConfig};

/// Broadcast hub server.
#[derive(Parser, Debug)]
#[command(name = "hub-server", about = "WebSocket broadcast hub server")]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = DEFAULT_ADDR)]
    addr: String,

    /// Heartbeat interval in milliseconds.
    #[arg(long, default_value_t = 1000)]
    heartbeat_ms: u64,

    /// Maximum concurrent connections (0 = unlimited).
    #[arg(long, default_value_t = 0)]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    ws_hub::telemetry::init_logging("info");
    let cli = Cli::parse();

    let config = ServerConfig::with_addr(cli.addr.as_str())
        .heartbeat_interval(Duration::from_millis(cli.heartbeat_ms))
        .max_connections(cli.max_connections);

    let server = HubServer::new(config);
    server
        .run_until(shutdown_signal())
        .await
        .with_context(|| format!("Failed to run server on {}", cli.addr))?;

    Ok(())
}
