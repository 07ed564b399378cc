//! Process signal handling

/// Resolves on SIGINT or SIGTERM
///
/// On non-unix targets only Ctrl-C is observed.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => tracing::info!("Received SIGINT"),
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(
                    error = %e,
                    "Failed to install signal handlers, falling back to Ctrl-C"
                );
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl-C"),
        Err(e) => {
            // Without a signal source there is nothing to wait for
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
