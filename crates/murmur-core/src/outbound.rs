//! Outbound loop: console lines to the transcript.

use std::{sync::Arc, time::Duration};

use crate::{ChatError, ConsoleSink, ConsoleSource, Shutdown, TranscriptWriter};

/// How long closing the output cursor may take before it is abandoned.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Why the outbound loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundEnd {
    /// The console reported end of input.
    InputClosed,
    /// Writing to the peer failed; the peer is most likely gone.
    WriteFailed,
    /// The conversation was cancelled.
    Cancelled,
}

/// Prompt, read a console line, send it, repeat.
///
/// Each line is sent with exactly one line feed and flushed immediately. The
/// output cursor is closed on every exit path so the peer sees end of stream.
///
/// # Errors
///
/// Returns [`ChatError::Console`] if the console read fails. There is no
/// recovering from a dead input source.
pub async fn run_outbound<S>(
    mut writer: TranscriptWriter,
    source: &mut S,
    sink: Arc<dyn ConsoleSink>,
    stop: Shutdown,
) -> Result<OutboundEnd, ChatError>
where
    S: ConsoleSource,
{
    let result = loop {
        sink.prompt();

        let input = tokio::select! {
            biased;
            () = stop.triggered() => break Ok(OutboundEnd::Cancelled),
            input = source.read_line() => input,
        };

        let text = match input {
            Ok(Some(text)) => text,
            Ok(None) => break Ok(OutboundEnd::InputClosed),
            Err(e) => break Err(ChatError::Console(e)),
        };

        let written = tokio::select! {
            biased;
            () = stop.triggered() => break Ok(OutboundEnd::Cancelled),
            written = writer.write_line(text.trim_end_matches(['\n', '\r'])) => written,
        };

        if let Err(e) = written {
            tracing::warn!("sending to peer failed: {e}");
            break Ok(OutboundEnd::WriteFailed);
        }
    };

    match tokio::time::timeout(CLOSE_GRACE, writer.close()).await {
        Ok(Ok(())) => {},
        Ok(Err(e)) => tracing::debug!("closing transcript output failed: {e}"),
        Err(_) => tracing::debug!("closing transcript output timed out"),
    }

    result
}
