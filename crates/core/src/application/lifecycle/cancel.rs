// Subscription Cancel Token

use tokio::sync::watch;

/// Cooperative cancellation signal observed by a poll task
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Check if cancellation was requested (a dropped handle counts as cancelled)
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Wait until cancellation is requested
    pub async fn cancelled(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Owner side of the cancel signal
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Create a cancel channel
pub fn cancel_channel() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let (handle, mut token) = cancel_channel();
        assert!(!token.is_cancelled());

        let waiter = tokio::spawn(async move {
            token.cancelled().await;
            token.is_cancelled()
        });
        handle.cancel();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_dropped_handle_counts_as_cancelled() {
        let (handle, mut token) = cancel_channel();
        drop(handle);
        assert!(token.is_cancelled());
        token.cancelled().await;
    }
}
