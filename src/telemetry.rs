//! Logging setup for the binaries

use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber writing to stderr
///
/// The filter comes from `RUST_LOG`, falling back to `default_directive`
/// (for example `"info"` or `"ws_hub=debug"`).
pub fn init_logging(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    // A subscriber may already be installed (tests, embedding); keep it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
