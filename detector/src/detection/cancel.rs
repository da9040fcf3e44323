use std::time::Duration;

use tokio::sync::watch;

/// Create a connected cancel pair. The handle side is given to whoever may
/// request a stop (the Ctrl+C task); the signal side to the loop.
pub fn channel() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait up to `limit` for a stop request. Returns true if one is pending.
    ///
    /// A dropped handle can no longer cancel, so the rest of the window is
    /// just slept through to keep the pacing.
    pub async fn wait(&mut self, limit: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        let deadline = tokio::time::Instant::now() + limit;
        match tokio::time::timeout_at(deadline, self.rx.wait_for(|stop| *stop)).await {
            Ok(Ok(_)) => true,
            Ok(Err(_)) => {
                tokio::time::sleep_until(deadline).await;
                false
            }
            Err(_) => false,
        }
    }
}
