//! Graceful shutdown on Ctrl+C or SIGTERM
//!
//! Components receive child tokens of one [`CancellationToken`]; cancelling
//! the controller cancels them all.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Clone, Default)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller cancelled by Ctrl+C, or SIGTERM on unix.
    pub fn with_signals() -> Self {
        let controller = Self::new();
        let token = controller.token.clone();

        tokio::spawn(async move {
            wait_for_signal().await;
            token.cancel();
        });

        controller
    }

    /// Child token; cancelling it does not affect the controller.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn shutdown(&self) {
        info!("Manual shutdown triggered");
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn wait_for_shutdown(&self) {
        self.token.cancelled().await;
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to listen for SIGTERM: {}", e);
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        _ = wait_for_ctrl_c() => {}
        _ = terminate.recv() => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown..."),
        Err(e) => {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_manual_shutdown() {
        let controller = ShutdownController::new();
        let token = controller.child_token();

        assert!(!controller.is_cancelled());
        controller.shutdown();

        assert!(controller.is_cancelled());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_child_token_independence() {
        let controller = ShutdownController::new();
        let child1 = controller.child_token();
        let child2 = controller.child_token();

        child1.cancel();
        assert!(!child2.is_cancelled());
        assert!(!controller.is_cancelled());

        controller.shutdown();
        assert!(child2.is_cancelled());
    }

    #[tokio::test]
    async fn test_wait_for_shutdown() {
        let controller = ShutdownController::new();
        let trigger = controller.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.shutdown();
        });

        let waited = tokio::time::timeout(Duration::from_secs(1), controller.wait_for_shutdown()).await;
        assert!(waited.is_ok());
    }
}
