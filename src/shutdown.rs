//! Shutdown monitor.
//!
//! A spawned task waits for SIGINT or SIGTERM and cancels the session token.
//! The monitor never touches the connection: the session controller observes
//! the token at every blocking I/O boundary and releases the socket itself,
//! so the connection has exactly one owner and one close. A frame torn by a
//! forced shutdown is acceptable; the contract is to stop promptly.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Spawn the signal listener and return the token the session observes.
pub fn spawn_monitor() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();

    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(()) => info!("termination signal received, cancelling session"),
            Err(err) => info!(error = %err, "signal listener failed, cancelling session"),
        }
        cancel.cancel();
    });

    token
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
