//! Raw duplex byte streams handed over by a host.

use std::fmt;

use tokio::io::{AsyncRead, AsyncWrite};

/// Boxed read half of a raw stream.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed write half of a raw stream.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A logical duplex stream with independent read and write halves.
///
/// Hosts produce these from whatever their transport provides (a QUIC
/// bidirectional stream, a simulated TCP connection). Nothing is buffered at this
/// level; [`Transcript`](crate::Transcript) adds line buffering on top.
pub struct RawStream {
    /// Bytes arriving from the remote peer.
    pub reader: BoxedReader,
    /// Bytes going to the remote peer.
    pub writer: BoxedWriter,
}

impl RawStream {
    /// Wrap a pair of halves.
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self { reader: Box::new(reader), writer: Box::new(writer) }
    }
}

impl fmt::Debug for RawStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawStream").finish_non_exhaustive()
    }
}
