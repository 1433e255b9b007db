//! Inbound loop: transcript lines to the console.

use std::sync::Arc;

use crate::{ConsoleSink, Line, Shutdown, TranscriptReader};

/// Why the inbound loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundEnd {
    /// The input cursor reached end of stream (or failed).
    PeerClosed,
    /// The conversation was cancelled.
    Cancelled,
}

/// Render every line the peer sends until the stream ends or `stop` fires.
///
/// Blank lines are dropped silently and do not end the loop.
pub async fn run_inbound(
    mut reader: TranscriptReader,
    sink: Arc<dyn ConsoleSink>,
    stop: Shutdown,
) -> InboundEnd {
    loop {
        let line = tokio::select! {
            biased;
            () = stop.triggered() => return InboundEnd::Cancelled,
            line = reader.next_line() => line,
        };

        match line {
            Some(Line::Text(text)) => sink.remote_line(&text),
            Some(Line::Blank) => {},
            None => {
                tracing::debug!("peer closed the transcript");
                return InboundEnd::PeerClosed;
            },
        }
    }
}
