//! Quinn-backed [`Host`].

use std::{net::SocketAddr, sync::Arc};

use murmur_core::{
    HandlerRegistry, Host, HostError, PeerDirectory, PeerId, ProtocolTag, RawStream, negotiate,
};
use quinn::{Connection, Endpoint, TransportConfig};
use rustls::crypto::CryptoProvider;
use tokio::task::AbortHandle;

use crate::{HostConfig, Identity, SERVER_NAME, tls};

/// QUIC host: one UDP endpoint that both accepts and dials.
///
/// Every bidirectional stream a peer opens is negotiated against the
/// injected [`HandlerRegistry`] and handed to the matching handler.
pub struct QuicHost {
    endpoint: Endpoint,
    peer_id: PeerId,
    handlers: Arc<HandlerRegistry>,
    directory: PeerDirectory,
    provider: Arc<CryptoProvider>,
    transport: Arc<TransportConfig>,
    accept_task: AbortHandle,
}

impl QuicHost {
    /// Bind the endpoint and start accepting connections.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn listen(
        config: &HostConfig,
        identity: &Identity,
        handlers: Arc<HandlerRegistry>,
    ) -> Result<Self, HostError> {
        let provider = tls::crypto_provider();
        let transport = tls::transport_config(config)?;
        let server_config =
            tls::server_config(identity, Arc::clone(&provider), Arc::clone(&transport))?;

        let endpoint = Endpoint::server(server_config, config.listen_addr)
            .map_err(|e| HostError::Bind { addr: config.listen_addr, reason: e.to_string() })?;

        let accept_task =
            tokio::spawn(accept_loop(endpoint.clone(), Arc::clone(&handlers))).abort_handle();

        tracing::info!(peer_id = %identity.peer_id(), addr = ?endpoint.local_addr().ok(), "QUIC host listening");

        Ok(Self {
            endpoint,
            peer_id: identity.peer_id(),
            handlers,
            directory: PeerDirectory::new(),
            provider,
            transport,
            accept_task,
        })
    }

    async fn connect(&self, peer: PeerId, addr: SocketAddr) -> Result<Connection, HostError> {
        let dial_error = |reason: String| HostError::Dial { peer, reason };

        let client_config =
            tls::client_config(peer, Arc::clone(&self.provider), Arc::clone(&self.transport))?;

        let connection = self
            .endpoint
            .connect_with(client_config, addr, SERVER_NAME)
            .map_err(|e| dial_error(e.to_string()))?
            .await
            .map_err(|e| dial_error(e.to_string()))?;

        tracing::debug!(%peer, %addr, "connected to peer");
        Ok(connection)
    }
}

impl Host for QuicHost {
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
        match self.endpoint.local_addr() {
            Ok(addr) => vec![addr],
            Err(e) => {
                tracing::warn!("failed to read local address: {e}");
                Vec::new()
            },
        }
    }

    async fn open_stream(&self, peer: PeerId, tag: &ProtocolTag) -> Result<RawStream, HostError> {
        let addresses = self.directory.addresses(&peer);
        let mut last_error = HostError::UnknownPeer(peer);

        for addr in addresses {
            let connection = match self.connect(peer, addr).await {
                Ok(connection) => connection,
                Err(e) => {
                    tracing::debug!(%peer, %addr, "dial attempt failed: {e}");
                    last_error = e;
                    continue;
                },
            };

            let (send, recv) = connection
                .open_bi()
                .await
                .map_err(|e| HostError::Dial { peer, reason: e.to_string() })?;

            let mut stream = RawStream::new(recv, send);
            negotiate::propose(&mut stream, tag).await?;

            tracing::debug!(%peer, %tag, "opened stream");
            return Ok(stream);
        }

        Err(last_error)
    }

    async fn close(&self) {
        self.accept_task.abort();
        self.endpoint.close(0u32.into(), b"closing");
        self.endpoint.wait_idle().await;
        tracing::debug!("QUIC host closed");
    }
}

impl Drop for QuicHost {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn accept_loop(endpoint: Endpoint, handlers: Arc<HandlerRegistry>) {
    while let Some(incoming) = endpoint.accept().await {
        let handlers = Arc::clone(&handlers);
        tokio::spawn(async move {
            match incoming.await {
                Ok(connection) => serve_connection(connection, handlers).await,
                Err(e) => tracing::debug!("incoming connection failed: {e}"),
            }
        });
    }

    tracing::debug!("endpoint closed, no longer accepting");
}

async fn serve_connection(connection: Connection, handlers: Arc<HandlerRegistry>) {
    let remote = connection.remote_address();
    tracing::debug!(%remote, "accepted connection");

    loop {
        match connection.accept_bi().await {
            Ok((send, recv)) => {
                let handlers = Arc::clone(&handlers);
                tokio::spawn(async move {
                    if let Err(e) = negotiate::accept(RawStream::new(recv, send), &handlers).await {
                        tracing::debug!(%remote, "inbound stream refused: {e}");
                    }
                });
            },
            Err(e) => {
                tracing::debug!(%remote, "connection ended: {e}");
                break;
            },
        }
    }
}
