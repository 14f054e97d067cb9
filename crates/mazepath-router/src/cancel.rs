//! Cooperative cancellation
//!
//! A [`CancelToken`] is a `watch` channel carrying a single flag. Every clone
//! observes the same flag, so the service can cancel a job from its
//! connection-closed handler while the dispatcher awaits on another task.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Shared cancellation flag for one job
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// Raise the flag; idempotent
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the flag is raised
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any token clone, so this only
        // returns early if every clone was dropped.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Connection liveness as seen by the dispatcher
pub trait Liveness: Send + Sync {
    fn is_connected(&self) -> bool;
}

/// Poll `liveness` every `interval` and cancel `token` once it drops
///
/// Returns after cancelling, or as soon as the token is cancelled elsewhere.
pub async fn watch_liveness(liveness: Arc<dyn Liveness>, token: CancelToken, interval: Duration) {
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(interval) => {
                if !liveness.is_connected() {
                    info!("Connection dropped during solve, cancelling job");
                    token.cancel();
                    return;
                }
            }
        }
    }
}
