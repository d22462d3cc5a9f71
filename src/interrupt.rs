//! Ctrl-C and SIGTERM handling for commands that own a sandbox.
//!
//! Once [`Interrupt::listen`] runs, the signals no longer terminate the
//! process. Commands race their long-running steps against
//! [`Interrupt::recv`] and still close the sandbox before exiting.

use tokio::sync::watch;
use tracing::{error, info};

/// Returned by a command that stopped because the operator interrupted it.
#[derive(Debug, thiserror::Error)]
#[error("Interrupted; sandbox was shut down")]
pub(crate) struct Interrupted;

/// Latched interrupt flag, cheap to clone.
#[derive(Debug, Clone)]
pub(crate) struct Interrupt(watch::Receiver<bool>);

impl Interrupt {
    /// Starts listening for Ctrl-C and SIGTERM. Must be called inside the runtime.
    pub fn listen() -> Self {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            shutdown_signal().await;
            let _ = tx.send(true);
        });
        Self(rx)
    }

    /// Creates an interrupt fired through the returned sender.
    #[cfg(test)]
    pub fn manual() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self(rx))
    }

    /// Creates an interrupt that never fires.
    #[cfg(test)]
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self(rx)
    }

    /// Resolves once an interrupt was received, immediately if one already was.
    ///
    /// Never resolves if no signal handler could be installed.
    pub async fn recv(&mut self) {
        if self.0.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down sandbox"),
        () = terminate => info!("Received SIGTERM, shutting down sandbox"),
    }
}
