//! Simulated host over turmoil TCP.
//!
//! Stands in for the QUIC host inside a turmoil simulation. Each logical
//! stream is its own TCP connection. Instead of a TLS handshake the
//! accepting side greets every connection with its peer id, and the dialer
//! drops the connection if that is not the peer it asked for.
//!
//! Peer ids are derived from the simulated host name, so a test can build
//! any node's address up front with [`SimHost::peer_id_of`] and
//! [`SimHost::address_of`].

use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};

use murmur_core::{
    HandlerRegistry, Host, HostError, PEER_ID_LEN, PeerAddress, PeerDirectory, PeerId,
    ProtocolTag, RawStream, negotiate,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    task::AbortHandle,
};
use turmoil::net::{TcpListener, TcpStream};

/// Bytes of the identity greeting: hex peer id and a line feed.
const GREETING_LEN: usize = PEER_ID_LEN * 2 + 1;

/// Host running inside a turmoil simulation.
pub struct SimHost {
    peer_id: PeerId,
    handlers: Arc<HandlerRegistry>,
    directory: PeerDirectory,
    addresses: Vec<SocketAddr>,
    accept_task: Option<AbortHandle>,
}

impl SimHost {
    /// Peer id of the simulated host called `name`.
    pub fn peer_id_of(name: &str) -> PeerId {
        PeerId::from_certificate(name.as_bytes())
    }

    /// Address of the simulated host `name` listening on `port`.
    ///
    /// Must be called from inside the simulation.
    pub fn address_of(name: &str, port: u16) -> PeerAddress {
        PeerAddress::new(SocketAddr::new(turmoil::lookup(name), port), Self::peer_id_of(name))
    }

    /// Listen on `port` as the simulated host `name`.
    ///
    /// `name` must be the turmoil host this runs on.
    pub async fn bind(
        name: &str,
        port: u16,
        handlers: Arc<HandlerRegistry>,
    ) -> Result<Self, HostError> {
        let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| HostError::Bind { addr: bind_addr, reason: e.to_string() })?;

        let peer_id = Self::peer_id_of(name);
        let accept_task =
            tokio::spawn(accept_loop(listener, peer_id, Arc::clone(&handlers))).abort_handle();

        tracing::debug!(name, port, %peer_id, "sim host listening");

        Ok(Self {
            peer_id,
            handlers,
            directory: PeerDirectory::new(),
            addresses: vec![SocketAddr::new(turmoil::lookup(name), port)],
            accept_task: Some(accept_task),
        })
    }

    /// Host that can dial but is bound nowhere.
    pub fn detached(name: &str, handlers: Arc<HandlerRegistry>) -> Self {
        Self {
            peer_id: Self::peer_id_of(name),
            handlers,
            directory: PeerDirectory::new(),
            addresses: Vec::new(),
            accept_task: None,
        }
    }

    async fn connect(&self, peer: PeerId, addr: SocketAddr) -> Result<RawStream, HostError> {
        let dial_error = |reason: String| HostError::Dial { peer, reason };

        let mut stream = TcpStream::connect(addr).await.map_err(|e| dial_error(e.to_string()))?;

        let mut greeting = [0u8; GREETING_LEN];
        stream.read_exact(&mut greeting).await.map_err(|e| dial_error(e.to_string()))?;

        let (id, terminator) = greeting.split_at(GREETING_LEN - 1);
        let presented =
            std::str::from_utf8(id).ok().and_then(|hex| hex.parse::<PeerId>().ok());
        if terminator != b"\n" || presented != Some(peer) {
            return Err(dial_error("peer presented wrong identity".to_string()));
        }

        let (reader, writer) = tokio::io::split(stream);
        Ok(RawStream::new(reader, writer))
    }
}

impl Host for SimHost {
    fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    fn directory(&self) -> &PeerDirectory {
        &self.directory
    }

    fn listen_addresses(&self) -> Vec<SocketAddr> {
        self.addresses.clone()
    }

    async fn open_stream(&self, peer: PeerId, tag: &ProtocolTag) -> Result<RawStream, HostError> {
        let mut last_error = HostError::UnknownPeer(peer);

        for addr in self.directory.addresses(&peer) {
            match self.connect(peer, addr).await {
                Ok(mut stream) => {
                    negotiate::propose(&mut stream, tag).await?;
                    return Ok(stream);
                },
                Err(e) => {
                    tracing::debug!(%peer, %addr, "sim dial failed: {e}");
                    last_error = e;
                },
            }
        }

        Err(last_error)
    }

    async fn close(&self) {
        if let Some(task) = &self.accept_task {
            task.abort();
        }
    }
}

impl Drop for SimHost {
    fn drop(&mut self) {
        if let Some(task) = &self.accept_task {
            task.abort();
        }
    }
}

async fn accept_loop(listener: TcpListener, peer_id: PeerId, handlers: Arc<HandlerRegistry>) {
    loop {
        let (mut stream, remote) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::debug!("sim accept failed: {e}");
                return;
            },
        };

        let handlers = Arc::clone(&handlers);
        tokio::spawn(async move {
            if let Err(e) = stream.write_all(format!("{peer_id}\n").as_bytes()).await {
                tracing::debug!(%remote, "sim greeting failed: {e}");
                return;
            }

            let (reader, writer) = tokio::io::split(stream);
            if let Err(e) = negotiate::accept(RawStream::new(reader, writer), &handlers).await {
                tracing::debug!(%remote, "sim stream refused: {e}");
            }
        });
    }
}
