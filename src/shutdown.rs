use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Install a handler that cancels the returned token on SIGTERM or SIGINT.
///
/// The server node and the load generator both stop on this token. If
/// SIGTERM cannot be hooked, Ctrl-C still works.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down"),
                    _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl-C only");
                match tokio::signal::ctrl_c().await {
                    Ok(()) => tracing::info!("Received SIGINT, shutting down"),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                        return;
                    }
                }
            }
        }
        trigger.cancel();
    });

    token
}
