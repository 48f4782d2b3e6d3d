//! Graceful shutdown on SIGINT/SIGTERM.

use tokio_util::sync::CancellationToken;

/// Watches for termination signals and cancels a shared token.
pub struct SigDown {
    token: CancellationToken,
}

impl SigDown {
    pub fn try_new() -> Result<Self, std::io::Error> {
        let token = CancellationToken::new();
        let cancel = token.clone();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;
            tokio::spawn(async move {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = sigint.recv() => {},
                }
                tracing::info!("shutdown signal received");
                cancel.cancel();
            });
        }

        #[cfg(not(unix))]
        {
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("shutdown signal received");
                    cancel.cancel();
                }
            });
        }

        Ok(Self { token })
    }

    /// Token cancelled when a shutdown signal arrives.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }
}
