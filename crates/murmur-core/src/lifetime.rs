//! Process lifetime.
//!
//! Once set up, a chat process has nothing to do on its main task except
//! wait. [`Lifetime::wait`] blocks until an external interrupt fires or some
//! task requests an [`Exit`] through a [`LifetimeHandle`], then triggers the
//! shared [`Shutdown`] so every loop unwinds.

use std::future::Future;

use tokio::sync::mpsc;

use crate::{ChatError, Shutdown};

/// Reason the process lifetime ended.
#[derive(Debug)]
pub enum Exit {
    /// External interrupt (ctrl-C).
    Interrupted,
    /// The operator closed console input.
    InputClosed,
    /// The only conversation of a dialer ended.
    ConversationEnded,
    /// A fatal error.
    Failed(ChatError),
}

impl Exit {
    /// Map graceful exits to `Ok` and failures to their error.
    pub fn into_result(self) -> Result<(), ChatError> {
        match self {
            Self::Failed(e) => Err(e),
            Self::Interrupted | Self::InputClosed | Self::ConversationEnded => Ok(()),
        }
    }
}

/// Owner side of the process lifetime.
#[derive(Debug)]
pub struct Lifetime {
    shutdown: Shutdown,
    exit_tx: mpsc::UnboundedSender<Exit>,
    exit_rx: mpsc::UnboundedReceiver<Exit>,
}

/// Cloneable handle used by tasks to end the lifetime or watch for shutdown.
#[derive(Debug, Clone)]
pub struct LifetimeHandle {
    shutdown: Shutdown,
    exit_tx: mpsc::UnboundedSender<Exit>,
}

impl Lifetime {
    /// Create a lifetime that has not ended.
    pub fn new() -> Self {
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        Self { shutdown: Shutdown::new(), exit_tx, exit_rx }
    }

    /// Handle for tasks spawned during setup.
    pub fn handle(&self) -> LifetimeHandle {
        LifetimeHandle { shutdown: self.shutdown.clone(), exit_tx: self.exit_tx.clone() }
    }

    /// Signal triggered when the lifetime ends.
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Block until `interrupt` resolves or an exit is requested.
    ///
    /// The first exit wins; later requests are ignored. The shutdown signal
    /// is triggered before returning.
    pub async fn wait(mut self, interrupt: impl Future<Output = ()>) -> Exit {
        let exit = tokio::select! {
            () = interrupt => Exit::Interrupted,
            exit = self.exit_rx.recv() => exit.unwrap_or(Exit::Interrupted),
        };

        tracing::info!(?exit, "process lifetime ended");
        self.shutdown.trigger();
        exit
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl LifetimeHandle {
    /// Request the lifetime to end.
    pub fn end(&self, exit: Exit) {
        if self.exit_tx.send(exit).is_err() {
            tracing::debug!("lifetime already ended");
        }
    }

    /// Signal triggered when the lifetime ends.
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }
}

#[cfg(test)]
mod tests {
    use std::{future, time::Duration};

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn interrupt_ends_lifetime_and_triggers_shutdown() {
        let lifetime = Lifetime::new();
        let shutdown = lifetime.shutdown().clone();

        let exit = lifetime.wait(future::ready(())).await;

        assert!(matches!(exit, Exit::Interrupted));
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn first_requested_exit_wins() {
        let lifetime = Lifetime::new();
        let handle = lifetime.handle();

        handle.end(Exit::InputClosed);
        handle.end(Exit::Failed(ChatError::NoListenPort));

        let exit = timeout(Duration::from_secs(1), lifetime.wait(future::pending())).await.unwrap();
        assert!(matches!(exit, Exit::InputClosed));
        assert!(handle.shutdown().is_triggered());
    }

    #[test]
    fn only_failures_are_errors() {
        assert!(Exit::Interrupted.into_result().is_ok());
        assert!(Exit::InputClosed.into_result().is_ok());
        assert!(Exit::ConversationEnded.into_result().is_ok());
        assert!(matches!(
            Exit::Failed(ChatError::NoListenPort).into_result(),
            Err(ChatError::NoListenPort)
        ));
    }
}
