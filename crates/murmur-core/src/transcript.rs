//! Line-oriented view of a raw stream.
//!
//! A [`Transcript`] is the single duplex channel of one conversation. It
//! splits into a [`TranscriptReader`] (input cursor) and a
//! [`TranscriptWriter`] (output cursor) so the inbound and outbound loops
//! each own exactly one side and never contend for a lock.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};

use crate::{BoxedReader, BoxedWriter, RawStream};

/// Upper bound on the bytes returned by a single line read.
///
/// Longer input arrives as several consecutive lines.
pub const MAX_LINE_BYTES: u64 = 64 * 1024;

/// One unit read from the input cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Text without its trailing line feed.
    Text(String),
    /// A line consisting only of the terminator.
    Blank,
}

impl Line {
    /// Classify raw bytes read up to and including a line feed.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes == b"\n" {
            return Self::Blank;
        }
        let text = bytes.strip_suffix(b"\n").unwrap_or(bytes);
        Self::Text(String::from_utf8_lossy(text).into_owned())
    }
}

/// Buffered duplex channel for one conversation.
pub struct Transcript {
    reader: TranscriptReader,
    writer: TranscriptWriter,
}

impl Transcript {
    /// Wrap a raw stream.
    pub fn new(stream: RawStream) -> Self {
        Self {
            reader: TranscriptReader::new(stream.reader),
            writer: TranscriptWriter::new(stream.writer),
        }
    }

    /// Separate the input and output cursors.
    pub fn split(self) -> (TranscriptReader, TranscriptWriter) {
        (self.reader, self.writer)
    }
}

/// Input cursor: sequential line reads.
pub struct TranscriptReader {
    inner: BufReader<BoxedReader>,
    pending: Vec<u8>,
    finished: bool,
}

impl TranscriptReader {
    fn new(reader: BoxedReader) -> Self {
        Self { inner: BufReader::new(reader), pending: Vec::new(), finished: false }
    }

    /// Read the next line.
    ///
    /// Returns `None` once the stream has ended. Read errors count as the end
    /// of the stream. After the first `None` every later call returns `None`
    /// without touching the stream again.
    ///
    /// Cancel safe: bytes of a partially read line stay buffered for the next
    /// call.
    pub async fn next_line(&mut self) -> Option<Line> {
        if self.finished {
            return None;
        }

        let remaining = MAX_LINE_BYTES.saturating_sub(self.pending.len() as u64);
        let read = (&mut self.inner).take(remaining).read_until(b'\n', &mut self.pending).await;

        match read {
            Ok(0) if self.pending.is_empty() => {
                self.finished = true;
                None
            },
            Ok(_) => {
                let line = Line::from_bytes(&self.pending);
                self.pending.clear();
                Some(line)
            },
            Err(e) => {
                tracing::debug!("transcript read failed, treating as end of stream: {e}");
                self.finished = true;
                None
            },
        }
    }

    /// Whether the end of the stream has been observed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Output cursor: sequential line writes, flushed per line.
pub struct TranscriptWriter {
    inner: BufWriter<BoxedWriter>,
}

impl TranscriptWriter {
    fn new(writer: BoxedWriter) -> Self {
        Self { inner: BufWriter::new(writer) }
    }

    /// Write `text` followed by a line feed, then flush.
    pub async fn write_line(&mut self, text: &str) -> io::Result<()> {
        self.inner.write_all(text.as_bytes()).await?;
        self.inner.write_all(b"\n").await?;
        self.inner.flush().await
    }

    /// Flush and close the output cursor so the peer observes end of stream.
    pub async fn close(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }
}
