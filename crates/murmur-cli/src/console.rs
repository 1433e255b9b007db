//! Terminal console: stdin lines in, rendered text out.

use std::io::{self, Write};

use murmur_core::{
    ConsoleSink, ConsoleSource,
    console::{PROMPT, render_alert, render_notice, render_remote_line},
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Operator input from stdin, one line at a time.
pub struct StdinSource {
    lines: Lines<BufReader<Stdin>>,
}

impl Default for StdinSource {
    fn default() -> Self {
        Self { lines: BufReader::new(tokio::io::stdin()).lines() }
    }
}

impl ConsoleSource for StdinSource {
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        self.lines.next_line().await
    }
}

/// Operator display on stdout.
pub struct StdoutSink;

impl StdoutSink {
    fn show(text: &str) {
        let mut stdout = io::stdout().lock();
        if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
            tracing::debug!("writing to stdout failed: {e}");
        }
    }
}

impl ConsoleSink for StdoutSink {
    fn prompt(&self) {
        Self::show(PROMPT);
    }

    fn remote_line(&self, text: &str) {
        Self::show(&render_remote_line(text));
    }

    fn notice(&self, message: &str) {
        Self::show(&render_notice(message));
    }

    fn alert(&self, message: &str) {
        Self::show(&render_alert(message));
    }
}
