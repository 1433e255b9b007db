//! Scripted operator console.
//!
//! [`ScriptedConsole`] stands in for stdin: the test pushes lines through a
//! [`ConsoleScript`] and closes it to simulate end of input. Everything the
//! process would print goes to a [`ConsoleRecorder`] instead of stdout.

use std::{io, sync::Arc, time::Duration};

use murmur_core::{ConsoleSink, ConsoleSource};
use parking_lot::Mutex;
use tokio::{
    sync::{mpsc, watch},
    time::{error::Elapsed, timeout},
};

/// Longest a test waits for the console to show something.
pub const WAIT_LIMIT: Duration = Duration::from_secs(10);

type Feed = mpsc::UnboundedSender<io::Result<String>>;

/// Console input fed from a [`ConsoleScript`].
#[derive(Debug)]
pub struct ScriptedConsole {
    lines: mpsc::UnboundedReceiver<io::Result<String>>,
}

impl ScriptedConsole {
    /// Create a source and the script that feeds it.
    pub fn new() -> (Self, ConsoleScript) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { lines: rx }, ConsoleScript { feed: Arc::new(Mutex::new(Some(tx))) })
    }
}

impl ConsoleSource for ScriptedConsole {
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        self.lines.recv().await.transpose()
    }
}

/// Test-side handle typing into a [`ScriptedConsole`].
///
/// Clones share the feed; [`close`](Self::close) ends input for all of them.
#[derive(Debug, Clone)]
pub struct ConsoleScript {
    feed: Arc<Mutex<Option<Feed>>>,
}

impl ConsoleScript {
    /// Type `text` and press enter.
    pub fn type_line(&self, text: &str) {
        self.push(Ok(format!("{text}\n")));
    }

    /// Make the next read fail with `kind`.
    pub fn fail(&self, kind: io::ErrorKind) {
        self.push(Err(io::Error::new(kind, "scripted console failure")));
    }

    /// End of input, like ctrl-D on a terminal.
    ///
    /// Lines typed before closing are still delivered.
    pub fn close(&self) {
        self.feed.lock().take();
    }

    fn push(&self, item: io::Result<String>) {
        let delivered = self.feed.lock().as_ref().is_some_and(|feed| feed.send(item).is_ok());
        if !delivered {
            tracing::debug!("console script input dropped, console already closed");
        }
    }
}

/// One thing the process showed the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    /// The input prompt
    Prompt,
    /// A line received from the peer
    Remote(String),
    /// An informational `--` diagnostic
    Notice(String),
    /// A failure `!!` diagnostic
    Alert(String),
}

/// Console display that records events for assertions.
#[derive(Debug)]
pub struct ConsoleRecorder {
    events: Mutex<Vec<ConsoleEvent>>,
    version: watch::Sender<u64>,
}

impl ConsoleRecorder {
    /// Create an empty recorder.
    pub fn new() -> Arc<Self> {
        Arc::new(Self { events: Mutex::new(Vec::new()), version: watch::Sender::new(0) })
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<ConsoleEvent> {
        self.events.lock().clone()
    }

    /// Lines received from the peer, in display order.
    pub fn remote_lines(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ConsoleEvent::Remote(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Notices shown so far.
    pub fn notices(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ConsoleEvent::Notice(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Wait until `done` holds for the recorded events.
    ///
    /// Gives up after [`WAIT_LIMIT`].
    pub async fn wait_until<F>(&self, mut done: F) -> Result<(), Elapsed>
    where
        F: FnMut(&[ConsoleEvent]) -> bool,
    {
        let mut changes = self.version.subscribe();
        timeout(WAIT_LIMIT, async {
            loop {
                let finished = done(&self.events.lock());
                if finished {
                    return;
                }
                // The sender lives in `self`, so this only fails if the
                // recorder is gone, which the borrow rules out.
                if changes.changed().await.is_err() {
                    return;
                }
            }
        })
        .await
    }

    /// Wait for the peer line `text` to be displayed.
    pub async fn wait_for_remote(&self, text: &str) -> Result<(), Elapsed> {
        self.wait_until(|events| events.iter().any(|e| *e == ConsoleEvent::Remote(text.into())))
            .await
    }

    /// Wait for a notice starting with `prefix`.
    pub async fn wait_for_notice(&self, prefix: &str) -> Result<(), Elapsed> {
        self.wait_until(|events| {
            events.iter().any(|e| matches!(e, ConsoleEvent::Notice(text) if text.starts_with(prefix)))
        })
        .await
    }

    /// Wait for `count` notices starting with `prefix`.
    pub async fn wait_for_notices(&self, prefix: &str, count: usize) -> Result<(), Elapsed> {
        self.wait_until(|events| {
            events
                .iter()
                .filter(|e| matches!(e, ConsoleEvent::Notice(text) if text.starts_with(prefix)))
                .count()
                >= count
        })
        .await
    }

    fn record(&self, event: ConsoleEvent) {
        self.events.lock().push(event);
        self.version.send_modify(|version| *version += 1);
    }
}

impl ConsoleSink for ConsoleRecorder {
    fn prompt(&self) {
        self.record(ConsoleEvent::Prompt);
    }

    fn remote_line(&self, text: &str) {
        self.record(ConsoleEvent::Remote(text.to_string()));
    }

    fn notice(&self, message: &str) {
        self.record(ConsoleEvent::Notice(message.to_string()));
    }

    fn alert(&self, message: &str) {
        self.record(ConsoleEvent::Alert(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_lines_keep_their_terminator() {
        let (mut source, script) = ScriptedConsole::new();
        script.type_line("hello");

        assert_eq!(source.read_line().await.unwrap(), Some("hello\n".to_string()));
    }

    #[tokio::test]
    async fn close_delivers_pending_lines_then_end_of_input() {
        let (mut source, script) = ScriptedConsole::new();
        script.type_line("last");
        script.close();
        script.type_line("ignored");

        assert_eq!(source.read_line().await.unwrap(), Some("last\n".to_string()));
        assert_eq!(source.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn scripted_failure_is_an_error() {
        let (mut source, script) = ScriptedConsole::new();
        script.fail(io::ErrorKind::BrokenPipe);

        let err = source.read_line().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn wait_wakes_on_later_event() {
        let recorder = ConsoleRecorder::new();
        let writer = Arc::clone(&recorder);

        let waiter = tokio::spawn(async move { recorder.wait_for_remote("hi").await });
        tokio::task::yield_now().await;
        writer.remote_line("hi");

        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_gives_up_after_limit() {
        let recorder = ConsoleRecorder::new();
        recorder.notice("unrelated");

        assert!(recorder.wait_for_remote("never").await.is_err());
    }
}
