//! Shutdown signal handling (SIGTERM/SIGINT).

use tokio::sync::watch;

/// Listens for OS shutdown signals and flips a watch channel to `true`.
pub struct SignalHandler {
    shutdown_tx: watch::Sender<bool>,
}

impl SignalHandler {
    /// Create a new signal handler and a receiver that becomes `true` on shutdown.
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { shutdown_tx: tx }, rx)
    }

    /// Wait for SIGINT or SIGTERM (Ctrl+C on non-unix), then signal shutdown.
    pub async fn run(self) {
        wait_for_shutdown().await;
        let _ = self.shutdown_tx.send(true);
    }

    /// Trigger shutdown without an OS signal.
    pub fn trigger(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {e}");
            ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = ctrl_c() => tracing::info!("Received SIGINT, initiating shutdown..."),
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating shutdown..."),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    ctrl_c().await;
    tracing::info!("Received Ctrl+C, initiating shutdown...");
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
