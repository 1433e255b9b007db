//! Host abstraction over the overlay transport.

use std::{future::Future, io, net::SocketAddr};

use thiserror::Error;

use crate::{HandlerRegistry, PeerDirectory, PeerId, ProtocolTag, RawStream, StreamHandler};

/// Errors from a host's transport operations.
#[derive(Debug, Error)]
pub enum HostError {
    /// Identity material could not be generated or loaded.
    #[error("failed to generate identity: {0}")]
    Identity(String),

    /// The listen endpoint could not be created.
    #[error("failed to listen on {addr}: {reason}")]
    Bind {
        /// Requested listen address
        addr: SocketAddr,
        /// Underlying failure
        reason: String,
    },

    /// The peer directory has no live addresses for the peer.
    #[error("no known addresses for peer {0}")]
    UnknownPeer(PeerId),

    /// Connecting to the peer failed (unreachable, wrong identity, closed).
    #[error("failed to connect to peer {peer}: {reason}")]
    Dial {
        /// Peer being dialed
        peer: PeerId,
        /// Underlying failure
        reason: String,
    },

    /// The remote side has no handler for the requested protocol.
    #[error("protocol '{0}' not supported by remote peer")]
    ProtocolNotSupported(String),

    /// The protocol negotiation exchange was malformed.
    #[error("protocol negotiation failed: {0}")]
    Negotiation(String),

    /// I/O failure on a stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Capabilities the chat core needs from the overlay transport.
///
/// A host listens for inbound streams (dispatching them through its
/// [`HandlerRegistry`]) and opens outbound streams to peers found in its
/// [`PeerDirectory`].
///
/// # Implementations
///
/// - **QUIC**: `murmur_transport::QuicHost`, TLS 1.3 over UDP
/// - **Simulated**: `murmur_harness::SimHost`, turmoil TCP for tests
pub trait Host: Send + Sync + 'static {
    /// Identity of this host.
    fn peer_id(&self) -> PeerId;

    /// Inbound protocol handlers.
    fn handlers(&self) -> &HandlerRegistry;

    /// Where known peers can be reached.
    fn directory(&self) -> &PeerDirectory;

    /// Addresses the host is actually bound to.
    ///
    /// Ports are the resolved ones, never the `0` that requested a
    /// system-assigned port.
    fn listen_addresses(&self) -> Vec<SocketAddr>;

    /// Open a stream to `peer` and negotiate `tag` on it.
    ///
    /// # Errors
    ///
    /// Fails if the peer has no directory entry, cannot be reached, or does
    /// not support the protocol.
    fn open_stream(
        &self,
        peer: PeerId,
        tag: &ProtocolTag,
    ) -> impl Future<Output = Result<RawStream, HostError>> + Send;

    /// Stop accepting streams and close all connections.
    fn close(&self) -> impl Future<Output = ()> + Send;

    /// Install the inbound handler for `tag`, replacing any previous one.
    fn set_handler(&self, tag: ProtocolTag, handler: StreamHandler) {
        if self.handlers().set(tag.clone(), handler) {
            tracing::debug!(%tag, "replaced stream handler");
        }
    }
}
