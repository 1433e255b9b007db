//! Operator console.
//!
//! The outbound loop reads operator lines from a [`ConsoleSource`]; both loops
//! and the controller write to a [`ConsoleSink`]. Console writes are not
//! serialized against each other, so a received line may land in the middle
//! of a prompt.

use std::{future::Future, io};

/// Prompt shown before each operator line.
pub const PROMPT: &str = "$> ";

/// Prefix of informational diagnostics.
pub const NOTICE_MARKER: &str = "--";

/// Prefix of failure diagnostics.
pub const ALERT_MARKER: &str = "!!";

/// ANSI colour wrapped around text that came from the remote peer.
const REMOTE_COLOUR: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Source of operator input lines.
pub trait ConsoleSource: Send + 'static {
    /// Read the next line typed by the operator.
    ///
    /// Returns `Ok(None)` when input is closed. Must be cancel safe: a line
    /// that was not returned because the future was dropped is delivered by
    /// the next call.
    fn read_line(&mut self) -> impl Future<Output = io::Result<Option<String>>> + Send;
}

/// Destination for everything shown to the operator.
pub trait ConsoleSink: Send + Sync + 'static {
    /// Show the input prompt.
    fn prompt(&self);

    /// Show a line received from the peer, then re-show the prompt.
    fn remote_line(&self, text: &str);

    /// Show an informational diagnostic.
    fn notice(&self, message: &str);

    /// Show a failure diagnostic.
    fn alert(&self, message: &str);
}

/// Terminal rendering of a remote line followed by a fresh prompt.
pub fn render_remote_line(text: &str) -> String {
    format!("{REMOTE_COLOUR}{text}{RESET}\n{PROMPT}")
}

/// Terminal rendering of an informational diagnostic.
pub fn render_notice(message: &str) -> String {
    format!("{NOTICE_MARKER} {message}\n")
}

/// Terminal rendering of a failure diagnostic.
pub fn render_alert(message: &str) -> String {
    format!("{ALERT_MARKER} {message}\n")
}
