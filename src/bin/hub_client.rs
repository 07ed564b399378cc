//! Broadcast hub client
//!
//! Run with: cargo run --bin hub-client -- [--addr HOST:PORT]
//!
//! Logs every payload the server pushes. On Ctrl-C or SIGTERM it tells the
//! server it is leaving and exits.

use anyhow::{Context, Result};
use clap::Parser;
use ws_hub::protocol::DEFAULT_ADDR;
use ws_hub::shutdown::shutdown_signal;
use ws_hub::{ClientConfig, HubClient};

/// Broadcast hub client.
#[derive(Parser, Debug)]
#[command(name = "hub-client", about = "WebSocket broadcast hub client")]
struct Cli {
    /// Server address to connect to.
    #[arg(long, default_value = DEFAULT_ADDR)]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    ws_hub::telemetry::init_logging("info");
    let cli = Cli::parse();

    let config = ClientConfig::new(cli.addr.as_str());
    let url = config.url();

    // Received payloads are already logged by the client
    let (client, _) = HubClient::connect(config)
        .await
        .with_context(|| format!("Failed to connect to {}", url))?;

    let exit = client.run_until(shutdown_signal()).await;
    tracing::info!(exit = ?exit, "Exiting");

    Ok(())
}
