//! Connection role controller.
//!
//! Chooses between listening for a peer and dialing one, performs the
//! matching setup against a [`Host`], and starts a [`Conversation`] once a
//! transcript exists.
//!
//! # Roles
//!
//! - **Listener**: installs the chat handler, advertises its address, and
//!   waits. Each accepted stream becomes a conversation; while one is active
//!   further streams are turned away. When the peer leaves, the listener goes
//!   back to waiting.
//! - **Dialer**: registers the target in the peer directory, opens one
//!   stream, and runs a single conversation. The process ends with it.

use std::{
    future::Future,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    sync::Arc,
};

use tokio::sync::Mutex;

use crate::{
    AddressError, CHAT_PROTOCOL, ChatError, ConsoleSink, ConsoleSource, Conversation,
    ConversationEnd, Exit, Host, Lifetime, LifetimeHandle, PeerAddress, PeerId, RawStream,
    StreamHandler, Transcript, Ttl,
};

/// Which side of the connection this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Accept an inbound stream.
    Listener,
    /// Open a stream to the given peer.
    Dialer(PeerAddress),
}

impl Role {
    /// Select the role from the `--dest` value.
    ///
    /// An empty value selects [`Role::Listener`]. Anything else, whitespace
    /// included, must parse as a [`PeerAddress`] and selects [`Role::Dialer`].
    pub fn from_dest(dest: &str) -> Result<Self, AddressError> {
        if dest.is_empty() { Ok(Self::Listener) } else { Ok(Self::Dialer(dest.parse()?)) }
    }
}

/// Address a dialer should use to reach a host bound to `listen_addresses`.
///
/// Picks the first address with a resolved port. A wildcard bind address is
/// advertised as loopback of the same family. Returns `None` if no port is
/// known.
pub fn advertised_address(peer_id: PeerId, listen_addresses: &[SocketAddr]) -> Option<PeerAddress> {
    let bound = listen_addresses.iter().find(|addr| addr.port() != 0)?;
    Some(PeerAddress::new(dialable(*bound), peer_id))
}

/// Replace a wildcard IP with loopback of the same family.
fn dialable(addr: SocketAddr) -> SocketAddr {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, addr.port())
}

/// Drives one chat process from setup to exit.
pub struct Controller<H, S> {
    host: Arc<H>,
    source: Arc<Mutex<S>>,
    sink: Arc<dyn ConsoleSink>,
    lifetime: Lifetime,
}

impl<H, S> Controller<H, S>
where
    H: Host,
    S: ConsoleSource,
{
    /// Create a controller over `host` and the operator console.
    pub fn new(host: Arc<H>, source: S, sink: Arc<dyn ConsoleSink>) -> Self {
        Self { host, source: Arc::new(Mutex::new(source)), sink, lifetime: Lifetime::new() }
    }

    /// Handle for ending the process lifetime from outside.
    pub fn lifetime_handle(&self) -> LifetimeHandle {
        self.lifetime.handle()
    }

    /// Perform the setup for `role` and block until the lifetime ends.
    ///
    /// `interrupt` is the external stop request (ctrl-C in the binary).
    ///
    /// # Errors
    ///
    /// Setup failures are returned before any conversation starts. A console
    /// read failure during a conversation is returned once the process has
    /// shut down.
    pub async fn run(
        self,
        role: Role,
        interrupt: impl Future<Output = ()> + Send,
    ) -> Result<(), ChatError> {
        let setup = match role {
            Role::Listener => self.listen(),
            Role::Dialer(target) => self.dial(target).await,
        };

        if let Err(e) = setup {
            self.host.close().await;
            return Err(e);
        }

        self.wait(interrupt).await
    }

    fn listen(&self) -> Result<(), ChatError> {
        self.host.set_handler(CHAT_PROTOCOL, self.stream_handler());

        let address = advertised_address(self.host.peer_id(), &self.host.listen_addresses())
            .ok_or(ChatError::NoListenPort)?;

        tracing::info!(%address, "listening for peers");
        self.sink.notice(&format!(
            "This node's address is {address}. To connect to it, run another node and specify \
             this address with the --dest option."
        ));

        Ok(())
    }

    async fn dial(&self, target: PeerAddress) -> Result<(), ChatError> {
        let peer_id = self.host.peer_id();
        self.sink.notice("This node's addresses are:");
        for addr in self.host.listen_addresses() {
            self.sink.notice(&format!(" - {}", PeerAddress::new(dialable(addr), peer_id)));
        }

        self.sink.notice(&format!("Got peer ID {}", target.peer_id()));
        self.host.directory().register(target.peer_id(), [target.socket()], Ttl::Permanent);
        tracing::info!(%target, "dialing peer");

        let stream = self.host.open_stream(target.peer_id(), &CHAT_PROTOCOL).await?;
        self.sink.notice("Initiated stream with host.");

        let source = Arc::clone(&self.source).lock_owned().await;
        let conversation = Conversation::start(
            Transcript::new(stream),
            source,
            Arc::clone(&self.sink),
            self.lifetime.shutdown(),
        );

        let lifetime = self.lifetime.handle();
        tokio::spawn(async move {
            let exit = match conversation.finished().await {
                Ok(ConversationEnd::InputClosed) => Exit::InputClosed,
                Ok(_) => Exit::ConversationEnded,
                Err(e) => Exit::Failed(e),
            };
            lifetime.end(exit);
        });

        Ok(())
    }

    /// Handler run by the host for every inbound chat stream.
    fn stream_handler(&self) -> StreamHandler {
        let source = Arc::clone(&self.source);
        let sink = Arc::clone(&self.sink);
        let lifetime = self.lifetime.handle();

        Arc::new(move |stream: RawStream| {
            if lifetime.shutdown().is_triggered() {
                return;
            }

            let Ok(guard) = Arc::clone(&source).try_lock_owned() else {
                tracing::warn!("rejecting inbound stream: a conversation is already active");
                sink.notice("Rejected a new stream, a conversation is already active");
                return;
            };

            sink.notice("Found a new stream, opening two way read-write buffer");
            let conversation = Conversation::start(
                Transcript::new(stream),
                guard,
                Arc::clone(&sink),
                lifetime.shutdown(),
            );

            let sink = Arc::clone(&sink);
            let lifetime = lifetime.clone();
            tokio::spawn(async move {
                match conversation.finished().await {
                    Ok(ConversationEnd::PeerClosed) => {
                        sink.notice("Peer closed the stream, waiting for a new connection");
                    },
                    Ok(ConversationEnd::WriteFailed) => {
                        sink.notice("Lost the peer while sending, waiting for a new connection");
                    },
                    Ok(ConversationEnd::InputClosed) => lifetime.end(Exit::InputClosed),
                    Ok(ConversationEnd::Cancelled) => {},
                    Err(e) => lifetime.end(Exit::Failed(e)),
                }
            });
        })
    }

    async fn wait(self, interrupt: impl Future<Output = ()> + Send) -> Result<(), ChatError> {
        let exit = self.lifetime.wait(interrupt).await;

        // Conversations hold the console source until both loops have exited.
        drop(self.source.lock().await);

        if let Exit::Failed(e) = &exit {
            tracing::error!("chat failed: {e}");
        }
        self.host.close().await;
        exit.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> PeerId {
        PeerId::from_bytes([7; 32])
    }

    #[test]
    fn empty_dest_selects_listener() {
        assert_eq!(Role::from_dest("").unwrap(), Role::Listener);
    }

    #[test]
    fn whitespace_dest_takes_dialer_path() {
        assert_eq!(Role::from_dest("   "), Err(AddressError::MissingLeadingSlash));

        let address = PeerAddress::new("127.0.0.1:4001".parse().unwrap(), peer());
        let padded = format!(" {address}");
        assert_eq!(Role::from_dest(&padded), Err(AddressError::MissingLeadingSlash));
    }

    #[test]
    fn address_dest_selects_dialer() {
        let address = PeerAddress::new("127.0.0.1:4001".parse().unwrap(), peer());
        let role = Role::from_dest(&address.to_string()).unwrap();
        assert_eq!(role, Role::Dialer(address));
    }

    #[test]
    fn malformed_dest_is_an_error() {
        assert_eq!(Role::from_dest("not-an-address"), Err(AddressError::MissingLeadingSlash));
    }

    #[test]
    fn wildcard_bind_is_advertised_as_loopback() {
        let bound: SocketAddr = "0.0.0.0:4001".parse().unwrap();
        let address = advertised_address(peer(), &[bound]).unwrap();
        assert_eq!(address.socket(), "127.0.0.1:4001".parse().unwrap());
        assert_eq!(address.peer_id(), peer());

        let bound: SocketAddr = "[::]:4002".parse().unwrap();
        let address = advertised_address(peer(), &[bound]).unwrap();
        assert_eq!(address.socket(), "[::1]:4002".parse().unwrap());
    }

    #[test]
    fn first_resolved_port_wins() {
        let addresses: Vec<SocketAddr> =
            vec!["0.0.0.0:0".parse().unwrap(), "192.0.2.4:4003".parse().unwrap()];
        let address = advertised_address(peer(), &addresses).unwrap();
        assert_eq!(address.socket(), "192.0.2.4:4003".parse().unwrap());
    }

    #[test]
    fn concrete_addresses_are_dialable_as_is() {
        let bound: SocketAddr = "192.0.2.4:4003".parse().unwrap();
        assert_eq!(dialable(bound), bound);
        assert_eq!(dialable("0.0.0.0:0".parse().unwrap()), "127.0.0.1:0".parse().unwrap());
    }

    #[test]
    fn no_port_means_nothing_to_advertise() {
        assert!(advertised_address(peer(), &[]).is_none());
        assert!(advertised_address(peer(), &["0.0.0.0:0".parse().unwrap()]).is_none());
    }
}
