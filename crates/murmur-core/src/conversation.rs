//! One conversation: a transcript and the two loops draining it.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐  peer EOF / input closed /  ┌─────────┐  both loops  ┌────────┐
//! │ Open │───────────────────────────>│ Closing │─────────────>│ Closed │
//! └──────┘  write failure / cancel     └─────────┘   exited     └────────┘
//! ```
//!
//! Each loop detects termination on its own cursor and then fires the
//! conversation's stop signal, which ends the other loop.

use std::sync::Arc;

use tokio::{sync::OwnedMutexGuard, task::JoinHandle};

use crate::{
    ChatError, ConsoleSink, ConsoleSource, InboundEnd, OutboundEnd, Shutdown, Transcript,
    run_inbound, run_outbound,
};

/// How a conversation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationEnd {
    /// The peer closed its side of the stream.
    PeerClosed,
    /// The operator closed console input.
    InputClosed,
    /// A write to the peer failed.
    WriteFailed,
    /// The process is shutting down.
    Cancelled,
}

impl ConversationEnd {
    fn from_loops(inbound: InboundEnd, outbound: OutboundEnd) -> Self {
        match (inbound, outbound) {
            (InboundEnd::PeerClosed, _) => Self::PeerClosed,
            (_, OutboundEnd::InputClosed) => Self::InputClosed,
            (_, OutboundEnd::WriteFailed) => Self::WriteFailed,
            (InboundEnd::Cancelled, OutboundEnd::Cancelled) => Self::Cancelled,
        }
    }
}

/// A running pair of inbound and outbound loops over one transcript.
pub struct Conversation {
    inbound: JoinHandle<InboundEnd>,
    outbound: JoinHandle<Result<OutboundEnd, ChatError>>,
    stop: Shutdown,
}

impl Conversation {
    /// Spawn both loops over `transcript`.
    ///
    /// The console source is held for the whole conversation; it is released
    /// when the outbound loop exits. `parent` cancels the conversation from
    /// outside.
    pub fn start<S>(
        transcript: Transcript,
        source: OwnedMutexGuard<S>,
        sink: Arc<dyn ConsoleSink>,
        parent: &Shutdown,
    ) -> Self
    where
        S: ConsoleSource,
    {
        let stop = parent.child();
        let (reader, writer) = transcript.split();

        let inbound = tokio::spawn({
            let sink = Arc::clone(&sink);
            let stop = stop.clone();
            async move {
                let end = run_inbound(reader, sink, stop.clone()).await;
                stop.trigger();
                end
            }
        });

        let outbound = tokio::spawn({
            let stop = stop.clone();
            async move {
                let mut source = source;
                let result = run_outbound(writer, &mut *source, sink, stop.clone()).await;
                stop.trigger();
                result
            }
        });

        tracing::debug!("conversation started");
        Self { inbound, outbound, stop }
    }

    /// Ask both loops to stop.
    pub fn cancel(&self) {
        self.stop.trigger();
    }

    /// Wait for both loops to exit.
    ///
    /// # Errors
    ///
    /// Returns the outbound loop's console failure, or [`ChatError::Task`] if
    /// a loop task panicked.
    pub async fn finished(self) -> Result<ConversationEnd, ChatError> {
        let (inbound, outbound) = tokio::join!(self.inbound, self.outbound);

        let inbound = inbound.map_err(|e| ChatError::Task(e.to_string()))?;
        let outbound = outbound.map_err(|e| ChatError::Task(e.to_string()))??;

        let end = ConversationEnd::from_loops(inbound, outbound);
        tracing::debug!(?end, "conversation finished");
        Ok(end)
    }
}
