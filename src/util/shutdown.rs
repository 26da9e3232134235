//! Graceful shutdown handling.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Manages graceful shutdown signals.
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    /// Create a new shutdown signal manager.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }

    /// Subscribe to shutdown notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Trigger shutdown.
    pub fn shutdown(&self) {
        let _ = self.sender.send(());
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for Ctrl+C or, on Unix, SIGTERM (sent by Kubernetes on pod stop).
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
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
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}

/// Wait for a background task to finish, logging a panic or cancellation.
///
/// Returns whether the task completed normally.
pub async fn join_task(name: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            error!(task = name, error = %e, "background task failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_subscribers_notified() {
        let signal = ShutdownSignal::new();
        let mut first = signal.subscribe();
        let mut second = signal.clone().subscribe();

        signal.shutdown();

        assert!(first.recv().await.is_ok());
        assert!(second.recv().await.is_ok());
    }

    #[test]
    fn test_shutdown_without_subscribers() {
        ShutdownSignal::default().shutdown();
    }

    #[tokio::test]
    async fn test_join_task_reports_panic() {
        assert!(join_task("ok", tokio::spawn(async {})).await);

        let failing = tokio::spawn(async { panic!("task blew up") });
        assert!(!join_task("failing", failing).await);

        let aborted = tokio::spawn(std::future::pending::<()>());
        aborted.abort();
        assert!(!join_task("aborted", aborted).await);
    }
}
