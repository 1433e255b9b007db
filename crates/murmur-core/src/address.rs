//! Peer identities and dialable peer addresses.
//!
//! A [`PeerId`] is the SHA-256 fingerprint of a peer's certificate. A
//! [`PeerAddress`] pairs a socket address with the identity expected at that
//! address, in a multiaddr-style text form:
//!
//! ```text
//! /ip4/127.0.0.1/udp/6666/quic-v1/p2p/<64 hex characters>
//! /ip6/::1/udp/6666/quic-v1/p2p/<64 hex characters>
//! ```

use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    str::FromStr,
};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of a peer id in bytes.
pub const PEER_ID_LEN: usize = 32;

/// Transport component of the address text form.
const QUIC_COMPONENT: &str = "quic-v1";

/// Errors from parsing peer ids and peer addresses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Input was empty.
    #[error("address is empty")]
    Empty,

    /// Input did not start with `/`.
    #[error("address must start with '/'")]
    MissingLeadingSlash,

    /// Network protocol other than `ip4` or `ip6`.
    #[error("unsupported protocol '{0}'")]
    UnsupportedProtocol(String),

    /// A protocol component had no value after it.
    #[error("missing value for '{0}'")]
    MissingValue(&'static str),

    /// A protocol component had a value that does not parse.
    #[error("invalid {kind} value '{value}'")]
    InvalidValue {
        /// Component the value belongs to
        kind: &'static str,
        /// Offending text
        value: String,
    },

    /// A different component was found where another was required.
    #[error("expected '{expected}', found '{found}'")]
    Unexpected {
        /// Component required at this position
        expected: &'static str,
        /// Component actually present (empty if the input ended)
        found: String,
    },

    /// The address ends before the `/p2p/<peer-id>` component.
    #[error("address has no peer id component")]
    MissingPeerId,

    /// Extra components after the peer id.
    #[error("unexpected trailing component '{0}'")]
    Trailing(String),

    /// Peer id is not 64 hex characters.
    #[error("invalid peer id: {0}")]
    InvalidPeerId(String),
}

/// Identity of a peer: the SHA-256 fingerprint of its certificate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId([u8; PEER_ID_LEN]);

impl PeerId {
    /// Wrap raw fingerprint bytes.
    pub const fn from_bytes(bytes: [u8; PEER_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive the peer id for a DER-encoded certificate.
    pub fn from_certificate(der: &[u8]) -> Self {
        let digest = Sha256::digest(der);
        let mut bytes = [0u8; PEER_ID_LEN];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Raw fingerprint bytes.
    pub fn as_bytes(&self) -> &[u8; PEER_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", hex::encode(&self.0[..4]))
    }
}

impl FromStr for PeerId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| AddressError::InvalidPeerId(e.to_string()))?;
        let bytes: [u8; PEER_ID_LEN] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            AddressError::InvalidPeerId(format!("expected {PEER_ID_LEN} bytes, got {}", bytes.len()))
        })?;

        Ok(Self(bytes))
    }
}

/// Dialable locator for a remote peer.
///
/// Immutable once parsed. Held only long enough to register the peer with
/// the [`PeerDirectory`](crate::PeerDirectory) and open a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    socket: SocketAddr,
    peer_id: PeerId,
}

impl PeerAddress {
    /// Create an address from its parts.
    pub const fn new(socket: SocketAddr, peer_id: PeerId) -> Self {
        Self { socket, peer_id }
    }

    /// Network location of the peer.
    pub fn socket(&self) -> SocketAddr {
        self.socket
    }

    /// Identity expected at that location.
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let family = match self.socket.ip() {
            IpAddr::V4(_) => "ip4",
            IpAddr::V6(_) => "ip6",
        };
        write!(
            f,
            "/{family}/{}/udp/{}/{QUIC_COMPONENT}/p2p/{}",
            self.socket.ip(),
            self.socket.port(),
            self.peer_id
        )
    }
}

impl FromStr for PeerAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AddressError::Empty);
        }

        let rest = s.strip_prefix('/').ok_or(AddressError::MissingLeadingSlash)?;
        let mut parts = rest.split('/');

        let ip = match parts.next() {
            Some("ip4") => IpAddr::V4(parse_value::<Ipv4Addr>(&mut parts, "ip4")?),
            Some("ip6") => IpAddr::V6(parse_value::<Ipv6Addr>(&mut parts, "ip6")?),
            Some(other) => return Err(AddressError::UnsupportedProtocol(other.to_string())),
            None => return Err(AddressError::Empty),
        };

        expect_component(&mut parts, "udp")?;
        let port = parse_value::<u16>(&mut parts, "udp")?;
        expect_component(&mut parts, QUIC_COMPONENT)?;

        match parts.next() {
            Some("p2p") => {},
            Some(other) => {
                return Err(AddressError::Unexpected { expected: "p2p", found: other.to_string() });
            },
            None => return Err(AddressError::MissingPeerId),
        }

        let peer_id = parts
            .next()
            .filter(|value| !value.is_empty())
            .ok_or(AddressError::MissingValue("p2p"))?
            .parse::<PeerId>()?;

        if let Some(extra) = parts.next() {
            return Err(AddressError::Trailing(extra.to_string()));
        }

        Ok(Self::new(SocketAddr::new(ip, port), peer_id))
    }
}

fn parse_value<'a, T: FromStr>(
    parts: &mut impl Iterator<Item = &'a str>,
    kind: &'static str,
) -> Result<T, AddressError> {
    let value =
        parts.next().filter(|value| !value.is_empty()).ok_or(AddressError::MissingValue(kind))?;

    value.parse().map_err(|_| AddressError::InvalidValue { kind, value: value.to_string() })
}

fn expect_component<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    expected: &'static str,
) -> Result<(), AddressError> {
    match parts.next() {
        Some(found) if found == expected => Ok(()),
        found => Err(AddressError::Unexpected {
            expected,
            found: found.unwrap_or_default().to_string(),
        }),
    }
}
