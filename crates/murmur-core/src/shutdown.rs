//! Cancellation signal.

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable one-shot cancellation signal.
///
/// Once triggered it stays triggered. Every clone observes the same state.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create an untriggered signal.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Trigger the signal, waking every waiter.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the signal has been triggered.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the signal is triggered (immediately if it already was).
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on trigger.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }

    /// Signal that also triggers when `self` triggers.
    ///
    /// Triggering the child does not affect the parent. Must be called from
    /// within a Tokio runtime.
    pub fn child(&self) -> Self {
        let parent = self.clone();
        let child = Self::new();

        let forward = child.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = parent.triggered() => forward.trigger(),
                () = forward.triggered() => {},
            }
        });

        child
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn clones_share_state() {
        let shutdown = Shutdown::new();
        let clone = shutdown.clone();

        assert!(!clone.is_triggered());
        shutdown.trigger();
        assert!(clone.is_triggered());
        timeout(Duration::from_secs(1), clone.triggered()).await.unwrap();
    }

    #[tokio::test]
    async fn waiter_wakes_on_trigger() {
        let shutdown = Shutdown::new();
        let waiter = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { shutdown.triggered().await }
        });

        tokio::task::yield_now().await;
        shutdown.trigger();

        timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn parent_trigger_reaches_child() {
        let parent = Shutdown::new();
        let child = parent.child();

        parent.trigger();

        timeout(Duration::from_secs(1), child.triggered()).await.unwrap();
    }

    #[tokio::test]
    async fn child_trigger_leaves_parent_alone() {
        let parent = Shutdown::new();
        let child = parent.child();

        child.trigger();
        tokio::task::yield_now().await;

        assert!(child.is_triggered());
        assert!(!parent.is_triggered());
    }
}
